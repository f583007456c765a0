//! Minigame phase and reward tracking
//!
//! Phase facts come from two sources: HUD widget states sampled every step,
//! and game chat/dialog text matched against a small set of fixed phrases.
//! A text that does not match leaves the derived fact at its last value.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::catalog::{self, GuardianKind};
use super::event::{HudWidgets, Widget};

/// Delay between the game start and the first altar opening
const FIRST_ALTAR_DELAY_SECS: i64 = 120;

const RIFT_ACTIVE: &str = "The rift becomes active!";
const RIFTS_KEPT_OPEN: &str = "The Portal Guardians will keep their rifts open for another 30 seconds.";
const LOOT_FOUND: &str = "You found some loot:";
const STARTING_IN: [(&str, i64); 3] = [
    ("The rift will become active in 30 seconds.", 30),
    ("The rift will become active in 10 seconds.", 10),
    ("The rift will become active in 5 seconds.", 5),
];

/// Saved and current-round reward energy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PointBalance {
    /// Saved elemental energy
    pub elemental: u32,
    /// Saved catalytic energy
    pub catalytic: u32,
    /// Elemental energy earned this round
    pub current_elemental: u32,
    /// Catalytic energy earned this round
    pub current_catalytic: u32,
    /// Elemental energy once this round is banked
    pub potential_elemental: u32,
    /// Catalytic energy once this round is banked
    pub potential_catalytic: u32,
}

/// Phase facts as reported in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseFacts {
    /// When the current portal appeared
    pub portal_spawn_time: Option<DateTime<Utc>>,
    /// When the last portal closed
    pub last_portal_despawn_time: Option<DateTime<Utc>>,
    /// When the next game is due to start
    pub next_game_start: Option<DateTime<Utc>>,
    /// When the current game started
    pub game_started: Option<DateTime<Utc>>,
    /// Whether the next portal is the first one of the game
    pub is_first_portal: bool,
    /// Portal location text ("S 20s")
    pub portal_location: Option<String>,
    /// Guardian energy in percent
    pub guardian_energy: Option<u32>,
    /// Whether more guardians can be built
    pub guardians_needed: bool,
    /// Currently open elemental altar
    pub open_elemental_altar: Option<String>,
    /// Currently open catalytic altar
    pub open_catalytic_altar: Option<String>,
    /// Seconds until the next game starts
    pub seconds_until_game_start: Option<i64>,
    /// Seconds the current portal has been open
    pub seconds_portal_open: Option<i64>,
    /// Seconds since the last portal closed
    pub seconds_since_last_portal: Option<i64>,
    /// Seconds until the first altar of the game opens
    pub seconds_until_first_altar: Option<i64>,
    /// Reward energy
    pub points: PointBalance,
}

/// Phase state machine
#[derive(Debug, Clone, Default)]
pub struct PhaseTracker {
    portal_spawn_time: Option<DateTime<Utc>>,
    last_portal_despawn_time: Option<DateTime<Utc>>,
    next_game_start: Option<DateTime<Utc>>,
    game_started: Option<DateTime<Utc>>,
    is_first_portal: bool,
    portal_location: Option<String>,
    guardian_energy: Option<u32>,
    guardians_needed: bool,
    elemental_sprite: Option<u32>,
    catalytic_sprite: Option<u32>,
    saved_elemental: u32,
    saved_catalytic: u32,
    current_elemental: u32,
    current_catalytic: u32,
}

impl PhaseTracker {
    /// Create a tracker with no phase information
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply this step's HUD widget states
    pub fn observe_widgets(&mut self, widgets: &HudWidgets, now: DateTime<Utc>) {
        observe_rune_sprite(widgets.elemental_rune.as_ref(), &mut self.elemental_sprite);
        observe_rune_sprite(widgets.catalytic_rune.as_ref(), &mut self.catalytic_sprite);

        if let Some(count) = &widgets.guardian_count {
            self.guardians_needed = count
                .text
                .as_deref()
                .is_some_and(|text| !text.contains("10/10"));
        }

        match &widgets.guardian_energy {
            Some(widget) => {
                if let Some(energy) = widget.text.as_deref().and_then(parse_percent) {
                    self.guardian_energy = Some(energy);
                }
            }
            None => self.guardian_energy = None,
        }

        match widgets.portal_text.as_ref().filter(|w| !w.hidden) {
            Some(portal) => {
                if self.portal_spawn_time.is_none() {
                    self.last_portal_despawn_time = None;
                    self.is_first_portal = false;
                    info!(location = ?portal.text, "portal opened");
                }
                self.portal_location = portal.text.clone();
                self.portal_spawn_time.get_or_insert(now);
            }
            None => {
                let hud_visible = widgets.elemental_rune.as_ref().is_some_and(|w| !w.hidden);
                if self.portal_spawn_time.take().is_some() && hud_visible {
                    self.last_portal_despawn_time = Some(now);
                    info!("portal closed");
                }
                self.portal_location = None;
            }
        }

        if let Some((catalytic, elemental)) = widgets
            .dialog
            .as_ref()
            .and_then(|d| d.text.as_deref())
            .and_then(parse_check_points)
        {
            self.saved_catalytic = catalytic;
            self.saved_elemental = elemental;
        }
    }

    /// Apply one game chat line
    pub fn observe_chat(&mut self, message: &str, now: DateTime<Utc>) {
        if message.contains(RIFT_ACTIVE) {
            self.last_portal_despawn_time = Some(now);
            self.next_game_start = None;
            self.game_started = Some(now);
            self.is_first_portal = true;
            info!("game started");
        } else if let Some((_, secs)) = STARTING_IN.iter().find(|(text, _)| message.contains(text)) {
            self.next_game_start = Some(now + Duration::seconds(*secs));
        } else if message.contains(RIFTS_KEPT_OPEN) {
            self.next_game_start = Some(now + Duration::seconds(60));
        } else if message.contains(LOOT_FOUND) {
            self.saved_elemental = self.saved_elemental.saturating_sub(1);
            self.saved_catalytic = self.saved_catalytic.saturating_sub(1);
        }

        if let Some((elemental, catalytic)) = parse_reward_totals(message) {
            self.saved_elemental = elemental;
            self.saved_catalytic = catalytic;
            info!(elemental, catalytic, "reward totals updated");
        }
    }

    /// Apply a varbit change; unrelated varbits are ignored
    pub fn observe_varbit(&mut self, varbit: u32, value: i32) {
        let value = u32::try_from(value).unwrap_or(0);
        match varbit {
            catalog::VARBIT_CURRENT_ELEMENTAL_POINTS => self.current_elemental = value,
            catalog::VARBIT_CURRENT_CATALYTIC_POINTS => self.current_catalytic = value,
            _ => {}
        }
    }

    /// Current reward balance
    pub fn points(&self) -> PointBalance {
        PointBalance {
            elemental: self.saved_elemental,
            catalytic: self.saved_catalytic,
            current_elemental: self.current_elemental,
            current_catalytic: self.current_catalytic,
            potential_elemental: potential_points(self.saved_elemental, self.current_elemental),
            potential_catalytic: potential_points(self.saved_catalytic, self.current_catalytic),
        }
    }

    /// Whether more guardians can be built
    pub fn guardians_needed(&self) -> bool {
        self.guardians_needed
    }

    /// Facts and countdowns as of `now`
    pub fn facts(&self, now: DateTime<Utc>) -> PhaseFacts {
        let since = |t: Option<DateTime<Utc>>| t.map(|t| (now - t).num_seconds());
        let until = |t: Option<DateTime<Utc>>| t.map(|t| (t - now).num_seconds().max(0));

        PhaseFacts {
            portal_spawn_time: self.portal_spawn_time,
            last_portal_despawn_time: self.last_portal_despawn_time,
            next_game_start: self.next_game_start,
            game_started: self.game_started,
            is_first_portal: self.is_first_portal,
            portal_location: self.portal_location.clone(),
            guardian_energy: self.guardian_energy,
            guardians_needed: self.guardians_needed,
            open_elemental_altar: open_altar(self.elemental_sprite, GuardianKind::Elemental),
            open_catalytic_altar: open_altar(self.catalytic_sprite, GuardianKind::Catalytic),
            seconds_until_game_start: until(self.next_game_start),
            seconds_portal_open: since(self.portal_spawn_time),
            seconds_since_last_portal: since(self.last_portal_despawn_time),
            seconds_until_first_altar: until(
                self.game_started
                    .map(|t| t + Duration::seconds(FIRST_ALTAR_DELAY_SECS)),
            ),
            points: self.points(),
        }
    }
}

fn observe_rune_sprite(widget: Option<&Widget>, last: &mut Option<u32>) {
    let Some(sprite) = widget.and_then(|w| w.sprite_id) else {
        return;
    };
    if *last != Some(sprite) {
        if let Some(guardian) = catalog::guardian_by_sprite(sprite) {
            info!(altar = guardian.name, "altar opened");
        }
        *last = Some(sprite);
    }
}

/// Guardian shown in a HUD rune slot; a sprite of the other alignment is ignored
fn open_altar(sprite: Option<u32>, kind: GuardianKind) -> Option<String> {
    sprite
        .and_then(catalog::guardian_by_sprite)
        .filter(|g| g.kind == kind)
        .map(|g| g.name.to_string())
}

fn potential_points(saved: u32, current: u32) -> u32 {
    if current == 0 {
        saved
    } else {
        saved.saturating_add(current / 100)
    }
}

/// Leading run of digits (thousands separators allowed) and the rest of `s`
fn leading_number(s: &str) -> Option<(u32, &str)> {
    let end = s
        .find(|c: char| !c.is_ascii_digit() && c != ',')
        .unwrap_or(s.len());
    let digits: String = s[..end].chars().filter(char::is_ascii_digit).collect();
    let value = digits.parse().ok()?;
    Some((value, &s[end..]))
}

/// First `N%` in `text`
fn parse_percent(text: &str) -> Option<u32> {
    text.match_indices('%').find_map(|(idx, _)| {
        let head = &text[..idx];
        let start = head
            .rfind(|c: char| !c.is_ascii_digit())
            .map_or(0, |i| i + 1);
        head[start..].parse().ok()
    })
}

/// "You have N catalytic energy and M elemental energy" → (N, M)
fn parse_check_points(text: &str) -> Option<(u32, u32)> {
    let (_, rest) = text.split_once("You have ")?;
    let (catalytic, rest) = leading_number(rest)?;
    let rest = rest.strip_prefix(" catalytic energy and ")?;
    let (elemental, rest) = leading_number(rest)?;
    rest.starts_with(" elemental energy")
        .then_some((catalytic, elemental))
}

/// Reward line "Total elemental energy: <col=..>N</col>. Total catalytic energy: <col=..>M</col>."
fn parse_reward_totals(message: &str) -> Option<(u32, u32)> {
    fn tagged_number<'a>(message: &'a str, label: &str) -> Option<(u32, &'a str)> {
        let (_, rest) = message.split_once(label)?;
        let close = rest.find('>')?;
        if close == 0 {
            return None;
        }
        leading_number(&rest[close + 1..])
    }

    let (elemental, rest) = tagged_number(message, "Total elemental energy:")?;
    let (catalytic, rest) = tagged_number(rest, "Total catalytic energy:")?;
    // A number cut off at the end of the line is incomplete
    (!rest.is_empty()).then_some((elemental, catalytic))
}
