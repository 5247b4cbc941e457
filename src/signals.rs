//! Change signals and transient notifications
//!
//! Each concern (world, HUD, notifications) has its own [`ChangeSignal`].
//! A renderer keeps a [`SignalCursor`] per concern it draws and polls it once
//! per frame, so any number of bumps inside one frame read as one change.

use serde::{Deserialize, Serialize};

/// Generation counter for one concern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSignal {
    generation: u64,
}

impl ChangeSignal {
    pub fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Subscriber-side view of a [`ChangeSignal`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalCursor {
    seen: u64,
}

impl SignalCursor {
    /// True if the signal moved since the last call; marks it seen
    pub fn changed(&mut self, signal: &ChangeSignal) -> bool {
        if signal.generation != self.seen {
            self.seen = signal.generation;
            true
        } else {
            false
        }
    }
}

/// The session's per-concern signals
#[derive(Debug, Clone, Default)]
pub struct SessionSignals {
    /// Player, obstacles, lines or coins moved
    pub world: ChangeSignal,
    /// Score, coins, phase, revives or multipliers changed
    pub hud: ChangeSignal,
    /// A notification was posted or expired
    pub notifications: ChangeSignal,
}

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    SpeedUp,
    RestZoneEnter,
    RestZoneExit,
    EmergencyInk,
    BoostExpired,
    ShieldAbsorbed,
    GraceGranted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationIcon {
    Speed,
    Rest,
    Ink,
    Boost,
    Shield,
    Heart,
}

/// A one-shot UX message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub icon: NotificationIcon,
    /// 0xRRGGBB
    pub color: u32,
    pub duration_ms: f32,
}

impl Notification {
    /// Stock message, icon and color for a kind
    pub fn standard(kind: NotificationKind, duration_ms: f32) -> Self {
        let (message, icon, color) = match kind {
            NotificationKind::SpeedUp => ("Speed up!", NotificationIcon::Speed, 0xFF_8A_3D),
            NotificationKind::RestZoneEnter => ("Rest zone", NotificationIcon::Rest, 0x4C_D9_A0),
            NotificationKind::RestZoneExit => ("Rest zone over", NotificationIcon::Rest, 0x9E_A7_B8),
            NotificationKind::EmergencyInk => ("Emergency ink!", NotificationIcon::Ink, 0x4A_9D_FF),
            NotificationKind::BoostExpired => ("Boost expired", NotificationIcon::Boost, 0xF5_C2_42),
            NotificationKind::ShieldAbsorbed => ("Shield absorbed a hit", NotificationIcon::Shield, 0xE0_4F_5F),
            NotificationKind::GraceGranted => ("Next run starts easier", NotificationIcon::Heart, 0xF2_7E_C4),
        };
        Self {
            kind,
            message: message.to_string(),
            icon,
            color,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveNotification {
    pub notification: Notification,
    pub remaining_ms: f32,
}

/// Auto-expiring notification channel
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    active: Vec<ActiveNotification>,
}

impl NotificationCenter {
    pub fn post(&mut self, notification: Notification) {
        let remaining_ms = notification.duration_ms.max(0.0);
        self.active.push(ActiveNotification {
            notification,
            remaining_ms,
        });
    }

    /// Age every notification; returns true if any expired
    pub fn advance(&mut self, delta_ms: f32) -> bool {
        let before = self.active.len();
        for n in &mut self.active {
            n.remaining_ms = (n.remaining_ms - delta_ms).max(0.0);
        }
        self.active.retain(|n| n.remaining_ms > 0.0);
        self.active.len() != before
    }

    /// Live notifications, oldest first
    pub fn active(&self) -> &[ActiveNotification] {
        &self.active
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.active.last().map(|n| &n.notification)
    }

    pub fn contains(&self, kind: NotificationKind) -> bool {
        self.active.iter().any(|n| n.notification.kind == kind)
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}
