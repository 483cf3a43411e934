//! Identifier resolution
//!
//! Callers address a creature by any of three keys: its sequence number,
//! its opaque id, or its name. A term carries no declared format, so the
//! resolver tries each strategy in [`RESOLUTION_ORDER`] and stops at the
//! first one that finds a document. Each attempt is one store round-trip
//! and attempts run one after another.
//!
//! ```text
//! "25"                                   -> SequenceNumber (no = 25)
//! "67e55044-10b1-426f-9247-bb680e5fe0c8" -> OpaqueId
//! " Pikachu "                            -> Name ("pikachu")
//! ```
//!
//! A term is numeric when it parses as a finite decimal float after
//! trimming (`"25"`, `"25.0"`, `"2.5e1"`). Radix prefixes are not
//! recognised: `"0x19"` is looked up as a name, never as `no = 25`.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{CatalogError, Result};
use crate::models::Creature;
use crate::store::{parse_id, CreatureFilter, CreatureStore};

/// The lookup strategies, in the order they are tried.
pub const RESOLUTION_ORDER: [LookupStrategy; 3] = [
    LookupStrategy::SequenceNumber,
    LookupStrategy::OpaqueId,
    LookupStrategy::Name,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    SequenceNumber,
    OpaqueId,
    Name,
}

/// What a strategy will ask the store for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Filter(CreatureFilter),
    Id(Uuid),
}

impl LookupStrategy {
    /// Derive the store key this strategy would query, or `None` when the
    /// term does not fit the strategy.
    pub fn key_for(self, term: &str) -> Option<LookupKey> {
        match self {
            Self::SequenceNumber => {
                let no = sequence_number(parse_numeric(term)?)?;
                Some(LookupKey::Filter(CreatureFilter::No(no)))
            }
            Self::OpaqueId => parse_id(term).map(LookupKey::Id),
            Self::Name => Some(LookupKey::Filter(CreatureFilter::Name(fold_name(term)))),
        }
    }
}

/// Lower-case and trim a name the way it is stored.
pub fn fold_name(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Parse a term as a finite number. Surrounding whitespace is ignored.
pub fn parse_numeric(term: &str) -> Option<f64> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// The `no` a numeric value can be equal to, if any.
fn sequence_number(value: f64) -> Option<u32> {
    if value.fract() != 0.0 || value < 1.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(value as u32)
}

/// Resolves ambiguous terms to a single creature.
#[derive(Clone)]
pub struct CreatureResolver {
    store: Arc<dyn CreatureStore>,
}

impl CreatureResolver {
    pub fn new(store: Arc<dyn CreatureStore>) -> Self {
        Self { store }
    }

    /// Resolve `term` or fail with `NotFound`.
    pub async fn resolve(&self, term: &str) -> Result<Creature> {
        self.try_resolve(term)
            .await?
            .ok_or_else(CatalogError::not_found)
    }

    /// Resolve `term`, returning `None` when no strategy matches.
    pub async fn try_resolve(&self, term: &str) -> Result<Option<Creature>> {
        debug_assert!(
            !(parse_numeric(term).is_some() && parse_id(term).is_some()),
            "term {term:?} is both numeric and an opaque id"
        );

        for strategy in RESOLUTION_ORDER {
            let Some(key) = strategy.key_for(term) else {
                continue;
            };
            let found = match &key {
                LookupKey::Filter(filter) => self.store.find_one(filter).await,
                LookupKey::Id(id) => self.store.find_by_id(*id).await,
            }
            .map_err(|e| CatalogError::internal("look up creature", e))?;

            if let Some(creature) = found {
                tracing::debug!(term, ?strategy, no = creature.no, "resolved creature");
                return Ok(Some(creature));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewCreature;
    use crate::store::InMemoryCreatureStore;
    use proptest::prelude::*;

    async fn resolver_with(entries: &[(u32, &str)]) -> (CreatureResolver, Vec<Creature>) {
        let store = Arc::new(InMemoryCreatureStore::new());
        let mut created = Vec::new();
        for (no, name) in entries {
            created.push(store.insert_one(NewCreature::new(*no, *name)).await.unwrap());
        }
        (CreatureResolver::new(store), created)
    }

    #[test]
    fn numeric_terms_map_to_sequence_numbers() {
        let no = |t: &str| LookupStrategy::SequenceNumber.key_for(t);
        assert_eq!(no("25"), Some(LookupKey::Filter(CreatureFilter::No(25))));
        assert_eq!(no(" 25 "), Some(LookupKey::Filter(CreatureFilter::No(25))));
        assert_eq!(no("25.0"), Some(LookupKey::Filter(CreatureFilter::No(25))));
        assert_eq!(no("2.5e1"), Some(LookupKey::Filter(CreatureFilter::No(25))));
        assert_eq!(no("25.5"), None);
        assert_eq!(no("0"), None);
        assert_eq!(no("-3"), None);
        assert_eq!(no("NaN"), None);
        assert_eq!(no("inf"), None);
        assert_eq!(no("pikachu"), None);
        assert_eq!(no(""), None);
        assert_eq!(no("0x19"), None);
        assert_eq!(no("0b11001"), None);
    }

    #[tokio::test]
    async fn hex_term_is_looked_up_by_name() {
        let (resolver, created) = resolver_with(&[(25, "pikachu"), (26, "0x19")]).await;
        let found = resolver.resolve("0x19").await.unwrap();
        assert_eq!(found, created[1]);
    }

    #[test]
    fn name_strategy_folds_case_and_whitespace() {
        assert_eq!(
            LookupStrategy::Name.key_for("  PikaChu "),
            Some(LookupKey::Filter(CreatureFilter::Name("pikachu".into())))
        );
    }

    #[tokio::test]
    async fn every_key_resolves_to_the_same_creature() {
        let (resolver, created) = resolver_with(&[(25, "pikachu"), (26, "raichu")]).await;
        let pikachu = &created[0];

        let by_no = resolver.resolve("25").await.unwrap();
        let by_id = resolver.resolve(&pikachu.id.to_string()).await.unwrap();
        let by_name = resolver.resolve("PIKACHU").await.unwrap();

        assert_eq!(&by_no, pikachu);
        assert_eq!(&by_id, pikachu);
        assert_eq!(&by_name, pikachu);
    }

    #[tokio::test]
    async fn numeric_term_falls_through_to_name() {
        // A name that happens to be numeric is still reachable once `no` misses
        let (resolver, created) = resolver_with(&[(1, "404")]).await;
        let found = resolver.resolve("404").await.unwrap();
        assert_eq!(found, created[0]);
    }

    #[tokio::test]
    async fn sequence_number_wins_over_name() {
        let (resolver, _) = resolver_with(&[(7, "squirtle"), (8, "7")]).await;
        let found = resolver.resolve("7").await.unwrap();
        assert_eq!(found.name, "squirtle");
    }

    #[tokio::test]
    async fn unmatched_term_is_not_found() {
        let (resolver, _) = resolver_with(&[(25, "pikachu")]).await;
        for term in ["26", "mewtwo", "67e55044-10b1-426f-9247-bb680e5fe0c8"] {
            let err = resolver.resolve(term).await.unwrap_err();
            assert!(matches!(err, CatalogError::NotFound(_)), "{term}");
        }
    }

    proptest! {
        #[test]
        fn numeric_terms_are_never_opaque_ids(n in any::<f64>()) {
            let term = n.to_string();
            prop_assert!(!(parse_numeric(&term).is_some() && parse_id(&term).is_some()));
        }

        #[test]
        fn opaque_ids_are_never_numeric(bytes in any::<[u8; 16]>()) {
            let term = Uuid::from_bytes(bytes).to_string();
            prop_assert!(parse_id(&term).is_some());
            prop_assert!(parse_numeric(&term).is_none());
        }
    }
}
