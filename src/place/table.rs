//! Static place-name table
//!
//! Keys are pre-normalized (trimmed, lowercase) names in Japanese,
//! Simplified Chinese and romanized form; several keys share one coordinate.
//! Declaration order is significant: suggestions are reported in it.

use crate::coord::Coordinate;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// (key, longitude, latitude)
const PLACES: &[(&str, f64, f64)] = &[
    // Major cities
    ("東京", 139.7671, 35.6812),
    ("东京", 139.7671, 35.6812),
    ("tokyo", 139.7671, 35.6812),
    ("大阪", 135.5023, 34.6937),
    ("osaka", 135.5023, 34.6937),
    ("京都", 135.7681, 35.0116),
    ("kyoto", 135.7681, 35.0116),
    ("横浜", 139.6380, 35.4437),
    ("横滨", 139.6380, 35.4437),
    ("yokohama", 139.6380, 35.4437),
    ("名古屋", 136.9066, 35.1815),
    ("nagoya", 136.9066, 35.1815),
    ("札幌", 141.3545, 43.0642),
    ("sapporo", 141.3545, 43.0642),
    ("福岡", 130.4017, 33.5904),
    ("福冈", 130.4017, 33.5904),
    ("fukuoka", 130.4017, 33.5904),
    ("神戸", 135.1955, 34.6901),
    ("神户", 135.1955, 34.6901),
    ("kobe", 135.1955, 34.6901),
    ("広島", 132.4596, 34.3853),
    ("广岛", 132.4596, 34.3853),
    ("hiroshima", 132.4596, 34.3853),
    ("仙台", 140.8719, 38.2682),
    ("sendai", 140.8719, 38.2682),
    // Tokyo districts
    ("新宿", 139.7005, 35.6938),
    ("shinjuku", 139.7005, 35.6938),
    ("渋谷", 139.7016, 35.6580),
    ("涩谷", 139.7016, 35.6580),
    ("shibuya", 139.7016, 35.6580),
    ("秋葉原", 139.7743, 35.6982),
    ("秋叶原", 139.7743, 35.6982),
    ("akihabara", 139.7743, 35.6982),
    ("浅草", 139.7967, 35.7148),
    ("asakusa", 139.7967, 35.7148),
    ("銀座", 139.7671, 35.6719),
    ("银座", 139.7671, 35.6719),
    ("ginza", 139.7671, 35.6719),
    // Nature
    ("富士山", 138.7274, 35.3606),
    ("fujisan", 138.7274, 35.3606),
    ("mt fuji", 138.7274, 35.3606),
    // Airports
    ("成田空港", 140.3929, 35.7719),
    ("成田机场", 140.3929, 35.7719),
    ("narita", 140.3929, 35.7719),
    ("羽田空港", 139.7798, 35.5494),
    ("羽田机场", 139.7798, 35.5494),
    ("haneda", 139.7798, 35.5494),
    // Tokyo landmarks
    ("東京タワー", 139.7454, 35.6586),
    ("东京塔", 139.7454, 35.6586),
    ("tokyo tower", 139.7454, 35.6586),
    ("スカイツリー", 139.8107, 35.7101),
    ("天空树", 139.8107, 35.7101),
    ("skytree", 139.8107, 35.7101),
    // Osaka
    ("usj", 135.4326, 34.6654),
    ("环球影城", 135.4326, 34.6654),
    ("大阪usj", 135.4326, 34.6654),
    ("universal studios japan", 135.4326, 34.6654),
    ("道顿堀", 135.5020, 34.6686),
    ("dotonbori", 135.5020, 34.6686),
    ("大阪城", 135.5258, 34.6873),
    ("osaka castle", 135.5258, 34.6873),
    ("心斋桥", 135.4998, 34.6718),
    ("shinsaibashi", 135.4998, 34.6718),
    // Kyoto
    ("清水寺", 135.7850, 34.9949),
    ("kiyomizu", 135.7850, 34.9949),
    ("金閣寺", 135.7292, 35.0394),
    ("金阁寺", 135.7292, 35.0394),
    ("kinkakuji", 135.7292, 35.0394),
    ("伏見稲荷", 135.7727, 34.9671),
    ("fushimi inari", 135.7727, 34.9671),
    // Other attractions
    ("迪士尼", 139.8811, 35.6329),
    ("disneyland", 139.8811, 35.6329),
    ("disney", 139.8811, 35.6329),
    ("镰仓", 139.5503, 35.3192),
    ("kamakura", 139.5503, 35.3192),
    ("箱根", 139.0286, 35.2322),
    ("hakone", 139.0286, 35.2322),
];

/// Immutable lookup over the place table
#[derive(Debug)]
pub struct PlaceTable {
    entries: Vec<(&'static str, Coordinate)>,
    index: HashMap<&'static str, usize>,
}

impl PlaceTable {
    fn build(places: &'static [(&'static str, f64, f64)]) -> Self {
        let entries: Vec<_> = places
            .iter()
            .map(|&(key, lng, lat)| (key, Coordinate::new(lng, lat)))
            .collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (*key, i))
            .collect();
        Self { entries, index }
    }

    /// Exact lookup by normalized key
    pub fn get(&self, key: &str) -> Option<Coordinate> {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    /// Keys containing `fragment`, in table order
    pub fn keys_containing<'a>(&'a self, fragment: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        self.entries
            .iter()
            .map(|(key, _)| *key)
            .filter(move |key| key.contains(fragment))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-wide place table, built on first use
pub static PLACE_TABLE: Lazy<PlaceTable> = Lazy::new(|| PlaceTable::build(PLACES));
