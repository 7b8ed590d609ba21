//! Seed vocabulary shipped with the crate.
//!
//! Used once, when no registry exists in durable storage. Aliases cover
//! the abbreviations agents actually write on their pages.

use crate::types::registry::TermCategory;

/// One seed term for registry initialization.
#[derive(Debug, Clone)]
pub struct SeedTerm {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub category: TermCategory,
}

const fn fiction(name: &'static str, aliases: &'static [&'static str]) -> SeedTerm {
    SeedTerm {
        name,
        aliases,
        category: TermCategory::Fiction,
    }
}

const fn nonfiction(name: &'static str, aliases: &'static [&'static str]) -> SeedTerm {
    SeedTerm {
        name,
        aliases,
        category: TermCategory::Nonfiction,
    }
}

/// The default seed vocabulary.
pub fn seed_terms() -> Vec<SeedTerm> {
    vec![
        // Fiction
        fiction("Literary Fiction", &["literary"]),
        fiction("Commercial Fiction", &["commercial"]),
        fiction("Fantasy", &["epic fantasy", "high fantasy"]),
        fiction("Science Fiction", &["sci-fi", "sf", "scifi"]),
        fiction("Speculative Fiction", &["speculative"]),
        fiction("Romance", &["romantic fiction"]),
        fiction("Mystery", &["mysteries", "cozy mystery"]),
        fiction("Thriller", &["thrillers", "suspense"]),
        fiction("Crime", &["crime fiction", "detective"]),
        fiction("Horror", &[]),
        fiction("Historical Fiction", &["historical"]),
        fiction("Women's Fiction", &[]),
        fiction("Upmarket Fiction", &["upmarket", "book club fiction"]),
        fiction("Graphic Novels", &["graphic novel", "comics"]),
        fiction("Short Stories", &["short fiction", "story collections"]),
        // Nonfiction
        nonfiction("Memoir", &["memoirs"]),
        nonfiction("Biography", &["biographies", "autobiography"]),
        nonfiction("History", &[]),
        nonfiction("True Crime", &[]),
        nonfiction("Science", &["popular science"]),
        nonfiction("Nature", &["nature writing", "environment"]),
        nonfiction("Self-Help", &["self help", "personal development"]),
        nonfiction("Business", &["business books"]),
        nonfiction("Politics", &["current affairs"]),
        nonfiction("Travel", &["travel writing"]),
        nonfiction("Food", &["cookery", "cookbooks", "cooking"]),
        nonfiction("Health", &["wellness", "wellbeing"]),
        nonfiction("Sport", &["sports"]),
        nonfiction("Narrative Nonfiction", &["narrative non-fiction"]),
        nonfiction("Essays", &["essay collections"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_names_unique_within_category() {
        let seeds = seed_terms();
        for (i, a) in seeds.iter().enumerate() {
            for b in seeds.iter().skip(i + 1) {
                if a.category == b.category {
                    assert!(
                        !a.name.eq_ignore_ascii_case(b.name),
                        "duplicate seed term: {}",
                        a.name
                    );
                }
            }
        }
    }
}
