//! The prize records served by the backend, and the payloads used to change them.
//!
//! The public dataset these records are loaded from encodes `year` and laureate `id` values as
//! JSON strings, so both a number and a numeric string are accepted when reading. Values are
//! always written back out as numbers.
use std::fmt::Display;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{NobelError, Result};

/// A single year/category award, possibly shared by several laureates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    /// the year the prize was awarded
    #[serde(deserialize_with = "number_or_string")]
    pub year: i32,
    /// the prize category, i.e. "physics"
    pub category: String,
    /// the motivation shared by all laureates of this prize
    #[serde(
        rename = "overallMotivation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub overall_motivation: Option<String>,
    /// the laureates of this prize, in award order
    #[serde(default)]
    pub laureates: Vec<Laureate>,
}

/// An individual or organization sharing in a [`Prize`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Laureate {
    /// identifier, unique across the whole collection. It is assigned by the store when a
    /// prize is created, so it may be left out of a create payload
    #[serde(default, deserialize_with = "number_or_string")]
    pub id: u64,
    /// first name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    /// surname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    /// the motivation for this laureate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
    /// the laureate's share of the prize, as a fraction denominator ("1", "2", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<String>,
}

impl Laureate {
    /// creates a laureate with the given names and no id (one is assigned when the
    /// enclosing prize is created)
    pub fn new(firstname: impl Into<String>, surname: impl Into<String>) -> Self {
        Laureate {
            id: 0,
            firstname: Some(firstname.into()),
            surname: Some(surname.into()),
            motivation: None,
            share: None,
        }
    }
}

/// The whole collection of prizes. This is also the layout of the persisted data file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prizes {
    /// every prize, in insertion order. Required, a document without it is not a collection
    pub prizes: Vec<Prize>,
}

impl Prizes {
    /// the highest laureate id in the collection, or 0 if there are no laureates
    pub fn max_laureate_id(&self) -> u64 {
        self.prizes
            .iter()
            .flat_map(|p| p.laureates.iter())
            .map(|l| l.id)
            .max()
            .unwrap_or(0)
    }

    /// index of the first prize matching `year` and `category`
    pub fn position(&self, year: i32, category: &str) -> Option<usize> {
        self.prizes.iter().position(|p| p.matches(year, category))
    }
}

impl Prize {
    /// creates a prize without an overall motivation
    pub fn new(year: i32, category: impl Into<String>, laureates: Vec<Laureate>) -> Self {
        Prize {
            year,
            category: category.into(),
            overall_motivation: None,
            laureates,
        }
    }

    /// true if this prize was awarded in `year` for `category`. Categories are compared
    /// case-insensitively
    pub fn matches(&self, year: i32, category: &str) -> bool {
        self.year == year && self.category.to_lowercase() == category.to_lowercase()
    }

    /// applies a partial update to this prize.
    ///
    /// Every laureate referenced by the update is looked up before anything is changed, so if
    /// one of them is missing the prize is left exactly as it was.
    ///
    /// # Errors
    /// [`NobelError::Validation`] if a laureate update has no `id`,
    /// [`NobelError::NotFound`] if a laureate `id` does not exist in this prize
    pub fn apply(&mut self, update: PrizeUpdate) -> Result<()> {
        let mut targets = Vec::new();
        for laureate_update in update.laureates.unwrap_or_default() {
            let id = laureate_update.id.ok_or_else(|| {
                NobelError::Validation("laureate updates must include an id".to_string())
            })?;
            let idx = self
                .laureates
                .iter()
                .position(|l| l.id == id)
                .ok_or_else(|| NobelError::NotFound(format!("laureate with id {}", id)))?;
            targets.push((idx, laureate_update));
        }

        if let Some(overall) = update.overall_motivation {
            self.overall_motivation = overall;
        }
        for (idx, laureate_update) in targets {
            laureate_update.apply_to(&mut self.laureates[idx]);
        }
        Ok(())
    }
}

/// A partial update of a [`Prize`].
///
/// Fields left out of the JSON payload are `None` and keep their current value. A field that is
/// present is `Some`, where an explicit `null` is `Some(None)` and clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeUpdate {
    /// new overall motivation
    #[serde(
        rename = "overallMotivation",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub overall_motivation: Option<Option<String>>,
    /// updates of individual laureates, matched by id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub laureates: Option<Vec<LaureateUpdate>>,
}

/// A partial update of a single [`Laureate`], see [`PrizeUpdate`] for the field semantics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaureateUpdate {
    /// the id of the laureate to update
    #[serde(
        default,
        deserialize_with = "optional_number_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<u64>,
    /// new first name
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub firstname: Option<Option<String>>,
    /// new surname
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub surname: Option<Option<String>>,
    /// new motivation
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub motivation: Option<Option<String>>,
    /// new share
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub share: Option<Option<String>>,
}

impl LaureateUpdate {
    fn apply_to(self, laureate: &mut Laureate) {
        if let Some(firstname) = self.firstname {
            laureate.firstname = firstname;
        }
        if let Some(surname) = self.surname {
            laureate.surname = surname;
        }
        if let Some(motivation) = self.motivation {
            laureate.motivation = motivation;
        }
        if let Some(share) = self.share {
            laureate.share = share;
        }
    }
}

/// The body returned when a prize was deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    /// confirmation message
    pub message: String,
    /// the prize that was removed
    pub prize: Prize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString<T> {
    Number(T),
    Text(String),
}

impl<T> NumberOrString<T>
where
    T: FromStr,
    T::Err: Display,
{
    fn into_number<E: serde::de::Error>(self) -> std::result::Result<T, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) => s.trim().parse().map_err(E::custom),
        }
    }
}

fn number_or_string<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    NumberOrString::<T>::deserialize(de)?.into_number()
}

fn optional_number_or_string<'de, D, T>(de: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<NumberOrString<T>>::deserialize(de)? {
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => {
            Err(D::Error::custom("laureate id must not be empty"))
        }
        Some(value) => value.into_number().map(Some),
        None => Ok(None),
    }
}

// only called when the field is present, so an explicit null becomes Some(None)
fn present<'de, D, T>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nobel_physics_1903() -> Prize {
        Prize {
            year: 1903,
            category: "physics".to_string(),
            overall_motivation: None,
            laureates: vec![
                Laureate {
                    id: 4,
                    firstname: Some("Henri".to_string()),
                    surname: Some("Becquerel".to_string()),
                    motivation: Some("\"spontaneous radioactivity\"".to_string()),
                    share: Some("2".to_string()),
                },
                Laureate {
                    id: 5,
                    firstname: Some("Pierre".to_string()),
                    surname: Some("Curie".to_string()),
                    motivation: Some("\"joint researches\"".to_string()),
                    share: Some("4".to_string()),
                },
            ],
        }
    }

    #[test]
    fn reads_the_public_dataset_layout() {
        let raw = r#"{"prizes":[{"year":"2023","category":"physics",
            "laureates":[{"id":"1026","firstname":"Pierre","surname":"Agostini",
            "motivation":"\"for experimental methods\"","share":"3"}]},
            {"year":"1943","category":"peace","overallMotivation":"No Nobel Prize was awarded this year."}]}"#;
        let prizes: Prizes = serde_json::from_str(raw).unwrap();

        assert_eq!(prizes.prizes.len(), 2);
        assert_eq!(prizes.prizes[0].year, 2023);
        assert_eq!(prizes.prizes[0].laureates[0].id, 1026);
        assert_eq!(prizes.prizes[0].laureates[0].share.as_deref(), Some("3"));
        assert!(prizes.prizes[1].laureates.is_empty());
        assert_eq!(prizes.max_laureate_id(), 1026);
    }

    #[test]
    fn a_document_without_prizes_is_not_a_collection() {
        assert!(serde_json::from_str::<Prizes>(r#"{"message":"maintenance"}"#).is_err());
        assert!(serde_json::from_str::<Prizes>(r#"{"prizes":{}}"#).is_err());

        let empty: Prizes = serde_json::from_str(r#"{"prizes":[]}"#).unwrap();
        assert!(empty.prizes.is_empty());
    }

    #[test]
    fn writes_numbers_and_omits_missing_fields() {
        let prize = Prize::new(2001, "peace", vec![Laureate::new("Kofi", "Annan")]);
        let json = serde_json::to_value(&prize).unwrap();

        assert_eq!(json["year"], 2001);
        assert_eq!(json["laureates"][0]["id"], 0);
        assert!(json.get("overallMotivation").is_none());
        assert!(json["laureates"][0].get("motivation").is_none());
    }

    #[test]
    fn matches_category_case_insensitively() {
        let prize = nobel_physics_1903();
        assert!(prize.matches(1903, "Physics"));
        assert!(prize.matches(1903, "PHYSICS"));
        assert!(!prize.matches(1904, "physics"));
        assert!(!prize.matches(1903, "chemistry"));
    }

    #[test]
    fn updating_overall_motivation_keeps_laureates() {
        let mut prize = nobel_physics_1903();
        let update: PrizeUpdate =
            serde_json::from_str(r#"{"overallMotivation":"radioactivity"}"#).unwrap();

        prize.apply(update).unwrap();

        assert_eq!(prize.overall_motivation.as_deref(), Some("radioactivity"));
        assert_eq!(prize.laureates, nobel_physics_1903().laureates);
    }

    #[test]
    fn laureate_update_only_touches_present_fields() {
        let mut prize = nobel_physics_1903();
        let update: PrizeUpdate =
            serde_json::from_str(r#"{"laureates":[{"id":"5","share":"2","motivation":null}]}"#)
                .unwrap();

        prize.apply(update).unwrap();

        let pierre = &prize.laureates[1];
        assert_eq!(pierre.share.as_deref(), Some("2"));
        assert_eq!(pierre.motivation, None);
        assert_eq!(pierre.firstname.as_deref(), Some("Pierre"));
        assert_eq!(prize.laureates[0], nobel_physics_1903().laureates[0]);
    }

    #[test]
    fn explicit_null_clears_overall_motivation() {
        let mut prize = nobel_physics_1903();
        prize.overall_motivation = Some("old".to_string());

        let absent: PrizeUpdate = serde_json::from_str("{}").unwrap();
        prize.apply(absent).unwrap();
        assert_eq!(prize.overall_motivation.as_deref(), Some("old"));

        let null: PrizeUpdate = serde_json::from_str(r#"{"overallMotivation":null}"#).unwrap();
        prize.apply(null).unwrap();
        assert_eq!(prize.overall_motivation, None);
    }

    #[test]
    fn unknown_laureate_leaves_prize_untouched() {
        let mut prize = nobel_physics_1903();
        let update: PrizeUpdate = serde_json::from_str(
            r#"{"overallMotivation":"changed","laureates":[{"id":4,"share":"1"},{"id":99,"share":"1"}]}"#,
        )
        .unwrap();

        let err = prize.apply(update).unwrap_err();

        assert!(matches!(err, NobelError::NotFound(ref what) if what.contains("99")));
        assert_eq!(prize, nobel_physics_1903());
    }

    #[test]
    fn laureate_update_without_id_is_rejected() {
        let mut prize = nobel_physics_1903();
        let update: PrizeUpdate =
            serde_json::from_str(r#"{"laureates":[{"firstname":"Marie"}]}"#).unwrap();

        assert!(matches!(prize.apply(update), Err(NobelError::Validation(_))));
    }

    #[test]
    fn update_serializes_only_present_fields() {
        let update = PrizeUpdate {
            overall_motivation: Some(None),
            laureates: Some(vec![LaureateUpdate {
                id: Some(4),
                surname: Some(Some("Curie".to_string())),
                ..LaureateUpdate::default()
            }]),
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(
            json,
            r#"{"overallMotivation":null,"laureates":[{"id":4,"surname":"Curie"}]}"#
        );

        let back: PrizeUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, update);
    }
}
