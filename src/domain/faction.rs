use serde::{Deserialize, Serialize};

/// The playable sides. `Combined` is a pseudo-faction holding the union of
/// all games; it drives activity tracking and doubles as the team rating in
/// 2v2 modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Faction {
    Soviet = 0,
    Allied = 1,
    Yuri = 2,
    Combined = 3,
}

pub const FACTION_COUNT: usize = 4;

pub const ALL_FACTIONS: [Faction; FACTION_COUNT] = [
    Faction::Soviet,
    Faction::Allied,
    Faction::Yuri,
    Faction::Combined,
];

impl Faction {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Faction {
        ALL_FACTIONS[index % FACTION_COUNT]
    }

    pub fn name(self) -> &'static str {
        match self {
            Faction::Soviet => "Soviet",
            Faction::Allied => "Allied",
            Faction::Yuri => "Yuri",
            Faction::Combined => "All/Sov",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Faction::Soviet => "sov",
            Faction::Allied => "all",
            Faction::Yuri => "yur",
            Faction::Combined => "mix",
        }
    }

    pub fn letter(self) -> &'static str {
        match self {
            Faction::Soviet => "s",
            Faction::Allied => "a",
            Faction::Yuri => "y",
            Faction::Combined => "m",
        }
    }

    /// Resolve a faction from the in-game country name. Quick match reports
    /// carry the country, not the side.
    pub fn from_country(country: &str) -> Option<Faction> {
        let lowered = country.to_lowercase();

        const ALLIED: [&str; 9] = [
            "greece", "turkey", "england", "spain", "france", "germany", "america", "korea",
            "britain",
        ];
        const SOVIET: [&str; 5] = ["ukraine", "iraq", "russia", "cuba", "libya"];

        if ALLIED.iter().any(|c| lowered.contains(c)) {
            Some(Faction::Allied)
        } else if SOVIET.iter().any(|c| lowered.contains(c)) {
            Some(Faction::Soviet)
        } else if lowered.contains("yuri") {
            Some(Faction::Yuri)
        } else {
            None
        }
    }

    pub fn from_short_name(short_name: &str) -> Option<Faction> {
        ALL_FACTIONS.into_iter().find(|f| f.short_name() == short_name)
    }
}

/// A 1v1 faction pairing as seen from player 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Setup {
    SvS = 0,
    AvS = 1,
    SvA = 2,
    AvA = 3,
    SvY = 4,
    YvS = 5,
    AvY = 6,
    YvA = 7,
    YvY = 8,
}

pub const SETUP_COUNT: usize = 9;

impl Setup {
    pub fn from_factions(first: Faction, second: Faction) -> Option<Setup> {
        use Faction::*;
        match (first, second) {
            (Soviet, Soviet) => Some(Setup::SvS),
            (Soviet, Allied) => Some(Setup::SvA),
            (Soviet, Yuri) => Some(Setup::SvY),
            (Allied, Soviet) => Some(Setup::AvS),
            (Allied, Allied) => Some(Setup::AvA),
            (Allied, Yuri) => Some(Setup::AvY),
            (Yuri, Soviet) => Some(Setup::YvS),
            (Yuri, Allied) => Some(Setup::YvA),
            (Yuri, Yuri) => Some(Setup::YvY),
            _ => None,
        }
    }

    /// Map mirrored pairings onto their canonical orientation, so each
    /// cross-faction matchup is tracked from a single reference side.
    pub fn canonical(self) -> Setup {
        match self {
            Setup::SvA => Setup::AvS,
            Setup::YvA => Setup::AvY,
            Setup::SvY => Setup::YvS,
            other => other,
        }
    }

    pub fn first_faction(self) -> Faction {
        match self {
            Setup::AvA | Setup::AvS | Setup::AvY => Faction::Allied,
            Setup::SvA | Setup::SvS | Setup::SvY => Faction::Soviet,
            Setup::YvA | Setup::YvS | Setup::YvY => Faction::Yuri,
        }
    }

    pub fn second_faction(self) -> Faction {
        match self {
            Setup::AvA | Setup::SvA | Setup::YvA => Faction::Allied,
            Setup::AvS | Setup::SvS | Setup::YvS => Faction::Soviet,
            Setup::AvY | Setup::SvY | Setup::YvY => Faction::Yuri,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Setup::SvS => "SvS",
            Setup::AvS => "AvS",
            Setup::SvA => "SvA",
            Setup::AvA => "AvA",
            Setup::SvY => "SvY",
            Setup::YvS => "YvS",
            Setup::AvY => "AvY",
            Setup::YvA => "YvA",
            Setup::YvY => "YvY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_names_resolve_to_sides() {
        assert_eq!(Faction::from_country("France"), Some(Faction::Allied));
        assert_eq!(Faction::from_country("Iraq"), Some(Faction::Soviet));
        assert_eq!(Faction::from_country("Yuri Country"), Some(Faction::Yuri));
        assert_eq!(Faction::from_country("Unbekannt"), None);
    }

    #[test]
    fn mirrored_setups_flip_to_canonical() {
        assert_eq!(Setup::SvA.canonical(), Setup::AvS);
        assert_eq!(Setup::YvA.canonical(), Setup::AvY);
        assert_eq!(Setup::SvY.canonical(), Setup::YvS);
        assert_eq!(Setup::AvS.canonical(), Setup::AvS);
        assert_eq!(Setup::SvS.canonical(), Setup::SvS);
    }

    #[test]
    fn canonical_setup_keeps_reference_side_first() {
        let setup = Setup::from_factions(Faction::Soviet, Faction::Allied).unwrap();
        assert_eq!(setup.canonical().first_faction(), Faction::Allied);
        assert_eq!(setup.canonical().second_faction(), Faction::Soviet);
    }
}
