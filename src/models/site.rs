//! Static content for the marketing pages: premium groups, referral
//! rewards and the contact form.

use serde::{Deserialize, Serialize};

pub const CONTACT_EMAIL: &str = "bettingparadise1@gmail.com";

/// A paid tips channel
#[derive(Debug, Clone, Serialize)]
pub struct PremiumGroup {
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    /// Monthly price in SEK
    pub monthly_price: u32,
}

pub fn premium_groups() -> Vec<PremiumGroup> {
    vec![
        PremiumGroup {
            name: "Bet365 Premium",
            icon: "🎯",
            description: "Få dagliga spel från Bet365 med hög vinstprocent.",
            monthly_price: 299,
        },
        PremiumGroup {
            name: "Paradise Premium",
            icon: "🌴",
            description: "Vår exklusiva kanal med speltips från flera bolag.",
            monthly_price: 249,
        },
    ]
}

/// Prize unlocked after a number of referred members
#[derive(Debug, Clone, Serialize)]
pub struct ReferralReward {
    pub icon: &'static str,
    pub referrals: u32,
    pub prize: &'static str,
}

pub fn referral_rewards() -> Vec<ReferralReward> {
    vec![
        ReferralReward {
            icon: "🎩",
            referrals: 5,
            prize: "BettingParadise keps",
        },
        ReferralReward {
            icon: "🌟",
            referrals: 10,
            prize: "Gratis månad i Premium",
        },
    ]
}

#[derive(Debug, Clone, Serialize)]
pub struct RewardProgress {
    pub referrals: u32,
    pub reached: Vec<ReferralReward>,
    pub next: Option<ReferralReward>,
    pub remaining: u32,
}

/// Which rewards a member with `referrals` recruits has unlocked, and how far
/// the next one is
pub fn reward_progress(referrals: u32) -> RewardProgress {
    let (reached, pending): (Vec<_>, Vec<_>) = referral_rewards()
        .into_iter()
        .partition(|reward| reward.referrals <= referrals);

    let next = pending.into_iter().min_by_key(|reward| reward.referrals);
    let remaining = next
        .as_ref()
        .map(|reward| reward.referrals - referrals)
        .unwrap_or(0);

    RewardProgress {
        referrals,
        reached,
        next,
        remaining,
    }
}

/// Contact form submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl ContactMessage {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.message.trim().is_empty()
        {
            return Err("Fyll i namn, e-post och meddelande.".to_string());
        }
        if !self.email.contains('@') {
            return Err(format!("Ogiltig e-postadress: {}", self.email.trim()));
        }
        Ok(())
    }
}
