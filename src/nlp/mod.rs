//! External NLP and vision collaborators behind narrow traits.
//!
//! Entity tagging, sentiment analysis, and image description are all external
//! services. Each trait is synchronous (call under `spawn_blocking`), and every
//! one of them is optional: an unconfigured or failing collaborator degrades to
//! empty/neutral signal instead of failing the operation that needed it. Only
//! the embedding collaborator (see [`crate::embedding`]) is load-bearing.

pub mod remote;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Classification of a token produced by the entity tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenClass {
    /// Named entity classes.
    Person,
    Org,
    Place,
    Event,
    Product,
    Date,
    /// Part-of-speech classes for non-entity tokens.
    Noun,
    ProperNoun,
    Other,
}

impl TokenClass {
    /// Whether this class is a named-entity label (as opposed to a POS tag).
    pub fn is_named_entity(&self) -> bool {
        matches!(
            self,
            Self::Person | Self::Org | Self::Place | Self::Event | Self::Product | Self::Date
        )
    }
}

/// A single token from the entity/POS tagger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedToken {
    pub text: String,
    pub class: TokenClass,
    /// Stop-word flag from the tagger's lexicon.
    #[serde(default)]
    pub is_stop: bool,
}

/// Sentiment signal for a text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sentiment {
    /// Polarity in `[-1, 1]`.
    pub polarity: f64,
    /// Subjectivity in `[0, 1]`.
    pub subjectivity: f64,
}

impl Sentiment {
    /// The neutral default used when the sentiment collaborator is absent.
    pub fn neutral() -> Self {
        Self {
            polarity: 0.0,
            subjectivity: 0.0,
        }
    }
}

/// What the image-entity collaborator saw in one photo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoDescription {
    /// Concrete objects detected in the image (e.g. "dog", "park").
    pub objects: Vec<String>,
    /// Scene/context labels (e.g. "outdoors", "celebration").
    pub labels: Vec<String>,
    /// Text recognized in the image, if any.
    #[serde(default)]
    pub ocr_text: String,
}

/// Entity and part-of-speech tagging collaborator.
pub trait EntityTagger: Send + Sync {
    fn tag(&self, text: &str) -> Result<Vec<TaggedToken>>;
}

/// Sentiment analysis collaborator.
pub trait SentimentAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<Sentiment>;
}

/// Image object/label/text detection collaborator. May fail per photo.
pub trait VisionProvider: Send + Sync {
    fn describe(&self, photo_url: &str) -> Result<PhotoDescription>;
}

/// Create the configured NLP collaborators. Each is `None` when its endpoint
/// is unset.
pub fn create_collaborators(
    config: &crate::config::NlpConfig,
) -> Result<(
    Option<Box<dyn EntityTagger>>,
    Option<Box<dyn SentimentAnalyzer>>,
    Option<Box<dyn VisionProvider>>,
)> {
    let tagger = config
        .tagger_endpoint
        .as_deref()
        .map(remote::RemoteNlpClient::new)
        .transpose()?
        .map(|c| Box::new(c) as Box<dyn EntityTagger>);

    let sentiment = config
        .sentiment_endpoint
        .as_deref()
        .map(remote::RemoteNlpClient::new)
        .transpose()?
        .map(|c| Box::new(c) as Box<dyn SentimentAnalyzer>);

    let vision = config
        .vision_endpoint
        .as_deref()
        .map(remote::RemoteNlpClient::new)
        .transpose()?
        .map(|c| Box::new(c) as Box<dyn VisionProvider>);

    Ok((tagger, sentiment, vision))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_entity_classes() {
        assert!(TokenClass::Person.is_named_entity());
        assert!(TokenClass::Date.is_named_entity());
        assert!(!TokenClass::Noun.is_named_entity());
        assert!(!TokenClass::Other.is_named_entity());
    }

    #[test]
    fn neutral_sentiment_is_zeroed() {
        let s = Sentiment::neutral();
        assert_eq!(s.polarity, 0.0);
        assert_eq!(s.subjectivity, 0.0);
    }

    #[test]
    fn tagged_token_deserializes_without_stop_flag() {
        let token: TaggedToken =
            serde_json::from_str(r#"{"text": "Mom", "class": "person"}"#).unwrap();
        assert_eq!(token.text, "Mom");
        assert_eq!(token.class, TokenClass::Person);
        assert!(!token.is_stop);
    }
}
