//! Code → display-name lookup tables.
//!
//! A [`Catalog`] is built once at start-up and handed to whatever needs it;
//! nothing in the workspace reads these tables through globals.

use std::collections::BTreeMap;

use crate::types::RegionId;

/// Geocache type codes as used by the search service.
pub mod cache_type {
    pub const TRADITIONAL: u32 = 2;
    pub const MULTI: u32 = 3;
    pub const VIRTUAL: u32 = 4;
    pub const LETTERBOX: u32 = 5;
    pub const EVENT: u32 = 6;
    pub const UNKNOWN: u32 = 8;
    pub const APE: u32 = 9;
    pub const WEBCAM: u32 = 11;
    pub const LOCATIONLESS: u32 = 12;
    pub const CITO: u32 = 13;
    pub const EARTHCACHE: u32 = 137;
    pub const MEGA: u32 = 453;
    pub const GPS_MAZE: u32 = 1304;
    pub const WHERIGO: u32 = 1858;
    pub const COMMUNITY_EVENT: u32 = 3653;
    pub const HQ_CACHE: u32 = 3773;
    pub const HQ_CELEBRATION: u32 = 3774;
    pub const BLOCK_PARTY: u32 = 4738;
    pub const GIGA: u32 = 7005;
}

/// Container size codes as used by the search service.
pub mod cache_size {
    pub const NOT_CHOSEN: u32 = 1;
    pub const MICRO: u32 = 2;
    pub const REGULAR: u32 = 3;
    pub const LARGE: u32 = 4;
    pub const VIRTUAL: u32 = 5;
    pub const OTHER: u32 = 6;
    pub const SMALL: u32 = 8;
}

/// Immutable lookup tables for categorical fields and regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    cache_types: BTreeMap<u32, String>,
    cache_sizes: BTreeMap<u32, String>,
    regions: BTreeMap<RegionId, String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// The service's published type and size names plus the default regions.
    pub fn standard() -> Self {
        use cache_size as s;
        use cache_type as t;

        let cache_types = [
            (t::TRADITIONAL, "Traditional"),
            (t::MULTI, "Multi"),
            (t::VIRTUAL, "Virtual"),
            (t::LETTERBOX, "Letterbox"),
            (t::EVENT, "Event"),
            (t::UNKNOWN, "Unknown"),
            (t::APE, "A.P.E. Cache"),
            (t::WEBCAM, "Webcam"),
            (t::LOCATIONLESS, "Locationless"),
            (t::CITO, "CITO"),
            (t::EARTHCACHE, "Earthcache"),
            (t::MEGA, "Mega"),
            (t::GPS_MAZE, "GPS Maze"),
            (t::WHERIGO, "Wherigo"),
            (t::COMMUNITY_EVENT, "Community Event"),
            (t::HQ_CACHE, "HQ Cache"),
            (t::HQ_CELEBRATION, "HQ Celebration"),
            (t::BLOCK_PARTY, "Block Party"),
            (t::GIGA, "Giga"),
        ];
        let cache_sizes = [
            (s::NOT_CHOSEN, "Not chosen"),
            (s::MICRO, "Micro"),
            (s::REGULAR, "Regular"),
            (s::LARGE, "Large"),
            (s::VIRTUAL, "Virtual"),
            (s::OTHER, "Other"),
            (s::SMALL, "Small"),
        ];

        Self {
            cache_types: to_map(&cache_types),
            cache_sizes: to_map(&cache_sizes),
            regions: default_regions(),
        }
    }

    /// Replace the region table, keeping the categorical tables.
    pub fn with_regions(mut self, regions: BTreeMap<RegionId, String>) -> Self {
        self.regions = regions;
        self
    }

    /// Display name for a geocache type; `""` when the code is unknown.
    pub fn cache_type_name(&self, code: u32) -> &str {
        self.cache_types.get(&code).map(String::as_str).unwrap_or("")
    }

    /// Display name for a container size; `""` when the code is unknown.
    pub fn cache_size_name(&self, code: u32) -> &str {
        self.cache_sizes.get(&code).map(String::as_str).unwrap_or("")
    }

    pub fn region_name(&self, id: &RegionId) -> Option<&str> {
        self.regions.get(id).map(String::as_str)
    }

    /// Regions in id order.
    pub fn regions(&self) -> impl Iterator<Item = (&RegionId, &str)> {
        self.regions.iter().map(|(id, name)| (id, name.as_str()))
    }
}

/// Australian states and territories plus the two New Zealand islands.
pub fn default_regions() -> BTreeMap<RegionId, String> {
    [
        ("52", "New South Wales"),
        ("53", "Victoria"),
        ("54", "Queensland"),
        ("55", "South Australia"),
        ("56", "Western Australia"),
        ("57", "Tasmania"),
        ("58", "Northern Territory"),
        ("59", "Australian Capital Territory"),
        ("82", "North Island NZ"),
        ("86", "South Island NZ"),
    ]
    .into_iter()
    .map(|(id, name)| (RegionId::from(id), name.to_string()))
    .collect()
}

fn to_map(pairs: &[(u32, &str)]) -> BTreeMap<u32, String> {
    pairs
        .iter()
        .map(|(code, name)| (*code, (*name).to_string()))
        .collect()
}
