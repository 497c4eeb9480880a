//! Material names and the token sets derived from them.

use url::Url;

/// Lower-cased word tokens of a material name, de-duplicated in order.
///
/// Splits on anything that is not alphanumeric, so punctuation such as
/// `&`, `,` and `-` never becomes a token.
pub fn tokenize(material: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for word in material
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if !tokens.iter().any(|t| t == word) {
            tokens.push(word.to_string());
        }
    }
    tokens
}

/// Tokens for a caller-supplied seed URL, taken from its path slug.
///
/// `https://dir.indiamart.com/impcat/slag-cement.html` yields
/// `["impcat", "slag", "cement"]`. Numeric pieces and file extensions
/// carry no meaning and are dropped.
pub fn seed_tokens(seed: &Url) -> Vec<String> {
    let mut words = Vec::new();
    for segment in seed.path_segments().into_iter().flatten() {
        let stem = match segment.rsplit_once('.') {
            Some((stem, ext)) if ext.chars().all(|c| c.is_ascii_alphabetic()) => stem,
            _ => segment,
        };
        for word in stem.split(['-', '_', '.', '+']) {
            if word.is_empty() || word.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            words.push(word);
        }
    }
    tokenize(&words.join(" "))
}

/// Canonical index-style material classes.
pub const MATERIAL_CLASSES: &[&str] = &[
    "Stainless Steel bars & rods, including flats",
    "Ordinary Portland cement",
    "slag cement",
    "Pozzolana cement",
    "Steel structures",
    "Manufacture of cement, lime and plaster",
    "Mild Steel - Semi Finished Steel",
    "Mild Steel - Long Products",
    "Mild Steel - Flat products",
    "Mild Steel (MS) Blooms",
    "White cement",
    "Cement superfine",
    "Manufacture of articles of concrete, cement",
    "Cement blocks (concrete)",
    "Angles, Channels, Sections, steel",
    "Mild steel (MS) flats & sheets",
];

/// Retailer category names.
pub const RETAIL_CATEGORIES: &[&str] = &[
    "Cement",
    "OPC-53 Grade Cement",
    "PPC Cement",
    "Sand & Aggregates",
    "TMT Steel Bars",
    "Fe-500 Grade TMT Bars",
    "Fe-550 Grade TMT Bars",
    "TMT Binding Wire",
    "Rebar Couplers",
    "Bricks & Blocks",
    "Concrete Solid Blocks",
    "Flyash Bricks",
    "Autoclaved Aerated Concrete (AAC) Blocks",
    "Red Bricks",
    "Conduit Pipes and Fittings",
    "Wires and Cables",
    "CPVC Pipes and Fittings",
    "UPVC Pipes and Fittings",
    "SWR Pipes and Fittings",
    "Plywood",
    "Floor Tiles",
    "Wall Tiles",
    "Vitrified Tiles",
    "Granites",
    "Marbles",
    "RMC (Ready Mix Concrete)",
    "Roofing Solutions",
    "Construction Chemicals",
];

/// Both default lists merged, first occurrence wins.
pub fn default_materials() -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in MATERIAL_CLASSES.iter().chain(RETAIL_CATEGORIES.iter()) {
        if !out.iter().any(|m| m.eq_ignore_ascii_case(item)) {
            out.push(item.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Ordinary Portland cement"),
            vec!["ordinary", "portland", "cement"]
        );
        assert_eq!(
            tokenize("Stainless Steel bars & rods, including flats"),
            vec!["stainless", "steel", "bars", "rods", "including", "flats"]
        );
        assert_eq!(tokenize("Mild steel (MS) flats & sheets")[2], "ms");
        assert_eq!(tokenize("Cement cement CEMENT"), vec!["cement"]);
        assert!(tokenize("  & - ").is_empty());
    }

    #[test]
    fn test_seed_tokens() {
        let seed = Url::parse("https://dir.indiamart.com/impcat/slag-cement.html").unwrap();
        assert_eq!(seed_tokens(&seed), vec!["impcat", "slag", "cement"]);

        let seed = Url::parse("https://www.buildersmart.in/birla-white-cement-50kg-26711").unwrap();
        assert_eq!(seed_tokens(&seed), vec!["birla", "white", "cement", "50kg"]);
    }

    #[test]
    fn test_default_materials_deduplicated() {
        let all = default_materials();
        assert_eq!(all[0], "Stainless Steel bars & rods, including flats");
        let cement = all.iter().filter(|m| m.eq_ignore_ascii_case("cement")).count();
        assert_eq!(cement, 1);
        assert_eq!(all.len(), MATERIAL_CLASSES.len() + RETAIL_CATEGORIES.len());
    }
}
