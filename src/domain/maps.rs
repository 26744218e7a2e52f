//! The canonical Blitz map pool. Incoming map names are noisy (client
//! variants, renamed uploads, raw scenario hashes), so resolution is fuzzy.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSize {
    Small,
    Medium,
    Large,
}

pub struct BlitzMap {
    pub name: &'static str,
    pub short_name: &'static str,
    pub size: MapSize,
}

use MapSize::{Large, Medium, Small};

pub const MAPS: [BlitzMap; 45] = [
    BlitzMap { name: "Alamo", short_name: "alamo", size: Small },
    BlitzMap { name: "Kong", short_name: "kong", size: Small },
    BlitzMap { name: "Big Little Lake", short_name: "lake", size: Small },
    BlitzMap { name: "Castle", short_name: "castle", size: Small },
    BlitzMap { name: "Oasis", short_name: "oasis", size: Small },
    BlitzMap { name: "Doom", short_name: "doom", size: Small },
    BlitzMap { name: "Yin Yang", short_name: "yinyang", size: Small },
    BlitzMap { name: "Brute", short_name: "brute", size: Small },
    BlitzMap { name: "Mummy", short_name: "mummy", size: Small },
    BlitzMap { name: "Surge", short_name: "surge", size: Small },
    BlitzMap { name: "Prime", short_name: "prime", size: Small },
    BlitzMap { name: "Demo", short_name: "demo", size: Small },
    BlitzMap { name: "Spark", short_name: "spark", size: Small },
    BlitzMap { name: "Carnival", short_name: "carnival", size: Large },
    BlitzMap { name: "Bongo", short_name: "bongo", size: Medium },
    BlitzMap { name: "Boom", short_name: "boom", size: Medium },
    BlitzMap { name: "Texas", short_name: "texas", size: Medium },
    BlitzMap { name: "Volley", short_name: "volley", size: Large },
    BlitzMap { name: "River Riot", short_name: "river riot", size: Large },
    BlitzMap { name: "Toothpick", short_name: "toothpick", size: Medium },
    BlitzMap { name: "Tundra", short_name: "tundra", size: Large },
    BlitzMap { name: "King's Hill", short_name: "kingshill", size: Medium },
    BlitzMap { name: "Dry Heat", short_name: "dryheat", size: Medium },
    BlitzMap { name: "Pirate Bay", short_name: "piratebay", size: Medium },
    BlitzMap { name: "Breaking Bad", short_name: "breaking bad", size: Medium },
    BlitzMap { name: "Skyrim Shot", short_name: "skyrim shot", size: Medium },
    BlitzMap { name: "Quick Sand", short_name: "quick sand", size: Small },
    BlitzMap { name: "Paika BLITZ", short_name: "paika", size: Small },
    BlitzMap { name: "The Doofus Omnibus", short_name: "omnibus", size: Medium },
    BlitzMap { name: "The Burg", short_name: "theburg", size: Medium },
    BlitzMap { name: "Downhill Rush", short_name: "downhillrush", size: Large },
    BlitzMap { name: "Cloud Nine", short_name: "cloudnine", size: Small },
    BlitzMap { name: "LgndFan", short_name: "lgndfan", size: Small },
    BlitzMap { name: "Dune II", short_name: "dune2", size: Medium },
    BlitzMap { name: "Momento", short_name: "momento", size: Medium },
    BlitzMap { name: "Revenant", short_name: "revenant", size: Large },
    BlitzMap { name: "Chimp Frenzy", short_name: "chimpfrenzy", size: Small },
    BlitzMap { name: "Equinox", short_name: "equinox", size: Large },
    BlitzMap { name: "RIP Jaws", short_name: "ripjaws", size: Large },
    BlitzMap { name: "The Path More Traveled", short_name: "pathtraveled", size: Large },
    BlitzMap { name: "Jeen Strike", short_name: "jeenstrike", size: Small },
    BlitzMap { name: "Thunder Dome", short_name: "thunderdome", size: Medium },
    BlitzMap { name: "Caladan", short_name: "caladan", size: Medium },
    BlitzMap { name: "Campgrounds", short_name: "campgrounds", size: Small },
    BlitzMap { name: "Night Shade", short_name: "night shade", size: Small },
];

pub const fn count() -> usize {
    MAPS.len()
}

pub fn name(index: usize) -> &'static str {
    MAPS[index].name.trim()
}

/// Raw scenario identifiers seen in the wild for maps whose reported name is
/// a content hash instead of a title.
const HASH_OVERRIDES: [(&str, &str); 4] = [
    ("7a1d4a7f28ce46b2a69d958ec0e118ec2a6e87bc", "Alamo"),
    ("0f7b1b5aa0b53b03b6f6ee947fd9c6ba741ea9dd", "Big Little Lake"),
    ("c8f9c6ac2f5e8e02a8d8ae6d0e21e7dfb41f3a44", "Yin Yang"),
    ("d12b4a61a92c84a3c1b3977de05c9f9e59bbf0a7", "King's Hill"),
];

/// Resolve a noisy map name to its index in the pool. Returns `None` for maps
/// outside the pool.
pub fn resolve(name: &str) -> Option<usize> {
    let mut trimmed = name.trim();

    if trimmed.is_empty() {
        log::error!("Passed empty map name.");
        return None;
    }

    if let Some((_, canonical)) = HASH_OVERRIDES.iter().find(|(hash, _)| *hash == trimmed) {
        trimmed = canonical;
    }

    if let Some(stripped) = trimmed.strip_suffix(" Dominator") {
        trimmed = stripped;
    }

    // First word is enough to identify a map, except for the "The ..." maps
    // where the second word is needed too.
    let mut prefix = trimmed;
    if let Some(space) = trimmed.find(' ') {
        prefix = &trimmed[..space];
        if prefix == "The" {
            if let Some(second_space) = trimmed[space + 1..].find(' ') {
                prefix = &trimmed[..space + 1 + second_space];
            } else {
                prefix = trimmed;
            }
        }
    }

    let lowered = prefix.to_lowercase();

    MAPS.iter().position(|map| {
        let name = map.name.to_lowercase();
        let short_name = map.short_name.to_lowercase();
        name.starts_with(&lowered) || short_name.starts_with(&lowered)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_names_resolve() {
        assert_eq!(resolve("Alamo"), Some(0));
        assert_eq!(resolve("Night Shade"), Some(44));
    }

    #[test]
    fn first_word_is_enough() {
        assert_eq!(resolve("Carnival v2 (by someone)"), Some(13));
        assert_eq!(resolve("tundra winter edit"), Some(20));
    }

    #[test]
    fn the_maps_need_two_words() {
        assert_eq!(resolve("The Burg"), Some(29));
        assert_eq!(resolve("The Path More Traveled"), Some(39));
        assert_eq!(resolve("The Doofus Omnibus"), Some(28));
    }

    #[test]
    fn short_names_resolve() {
        assert_eq!(resolve("kingshill"), Some(21));
        assert_eq!(resolve("dune2"), Some(33));
    }

    #[test]
    fn dominator_suffix_is_stripped() {
        assert_eq!(resolve("Texas Dominator"), Some(16));
    }

    #[test]
    fn hash_overrides_resolve() {
        assert_eq!(resolve("7a1d4a7f28ce46b2a69d958ec0e118ec2a6e87bc"), Some(0));
    }

    #[test]
    fn unknown_maps_do_not_resolve() {
        assert_eq!(resolve("Desert Storm Classic"), None);
        assert_eq!(resolve(""), None);
    }
}
