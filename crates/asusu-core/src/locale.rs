//! Static string tables for the group views.
//!
//! Lookups are pure; no I/O happens here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    English,
    Hausa,
}

impl Locale {
    /// Parse a loose locale tag such as `en`, `ha`, `English` or `Hausa`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "en" | "eng" | "english" => Some(Self::English),
            "ha" | "hau" | "hausa" => Some(Self::Hausa),
            _ => None,
        }
    }
}

/// Closed set of translatable strings used by the group screens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    GroupNameTooShort,
    GroupCreated,
    NewGroupSetup,
    Cancel,
    Back,
    GroupName,
    Amount,
    MaxSlots,
    LaunchGroup,
    PotTotal,
    PerTurn,
    GroupMembers,
    Members,
    Me,
    AdminControls,
    DisbursePayouts,
    TriggerDisbursement,
    ForceStartCycle,
    GroupSettings,
    CloseGroup,
    ContributionHistory,
    NoContributions,
    ActiveSavings,
    Progress,
}

pub fn translate(key: MessageKey, locale: Locale) -> &'static str {
    use MessageKey::*;
    match locale {
        Locale::English => match key {
            GroupNameTooShort => "Group name must be at least 3 characters.",
            GroupCreated => "Asusu Group created successfully!",
            NewGroupSetup => "New Group Setup",
            Cancel => "Cancel",
            Back => "Back",
            GroupName => "Group Name",
            Amount => "Amount",
            MaxSlots => "Max Slots",
            LaunchGroup => "Launch Amana Group",
            PotTotal => "Pot Total",
            PerTurn => "Per Turn",
            GroupMembers => "Group Members",
            Members => "Members",
            Me => "Me",
            AdminControls => "Admin Controls",
            DisbursePayouts => "Disburse Payouts",
            TriggerDisbursement => "Trigger Disbursement",
            ForceStartCycle => "Force Start Cycle",
            GroupSettings => "Group Settings",
            CloseGroup => "Close Group",
            ContributionHistory => "Contribution History",
            NoContributions => "No contributions recorded yet",
            ActiveSavings => "Active Savings",
            Progress => "Progress",
        },
        Locale::Hausa => match key {
            GroupNameTooShort => "Sunan rukunin dole ya kai haruffa 3.",
            GroupCreated => "An bude asusu cikin nasara!",
            NewGroupSetup => "Bude Sabon Rukuni",
            Cancel => "Soke",
            Back => "Koma",
            GroupName => "Sunan Rukuni",
            Amount => "Adadin Kudi",
            MaxSlots => "Adadin Mutane",
            LaunchGroup => "Bude Asusun",
            PotTotal => "Jimillar Tarawa",
            PerTurn => "Kudin Zira",
            GroupMembers => "Mambobi",
            Members => "Mutane",
            Me => "Ni",
            AdminControls => "Ikon Gudanarwa",
            DisbursePayouts => "Biya kowa yanzu",
            TriggerDisbursement => "Fitar da kudin kowa",
            ForceStartCycle => "Fara Zagayen",
            GroupSettings => "Saita Group",
            CloseGroup => "Kulle Group",
            ContributionHistory => "Tarihin Biyan Kudi",
            NoContributions => "Babu tarihin biya tukuna",
            ActiveSavings => "Kudin da Aka Tara",
            Progress => "An Biya",
        },
    }
}

pub(crate) fn turn_reminder(locale: Locale, group_name: &str) -> String {
    match locale {
        Locale::English => format!("It's your turn to contribute to \"{}\"!", group_name),
        Locale::Hausa => format!("Lokacinka ya yi na biyan kudi a \"{}\"!", group_name),
    }
}

pub(crate) fn payout_reminder(locale: Locale, group_name: &str) -> String {
    match locale {
        Locale::English => format!("Group \"{}\" is ready for payout!", group_name),
        Locale::Hausa => format!("Rukunin \"{}\" ya shirya don biyan kudi!", group_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loose_tags() {
        assert_eq!(Locale::parse("HA"), Some(Locale::Hausa));
        assert_eq!(Locale::parse(" english "), Some(Locale::English));
        assert_eq!(Locale::parse("fr"), None);
    }

    #[test]
    fn hausa_table_differs_from_english() {
        assert_ne!(
            translate(MessageKey::PotTotal, Locale::English),
            translate(MessageKey::PotTotal, Locale::Hausa)
        );
        assert_eq!(translate(MessageKey::Back, Locale::Hausa), "Koma");
    }
}
