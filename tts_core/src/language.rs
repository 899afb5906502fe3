use std::{fmt, str::FromStr};

use serde::Serialize;

/// Supported language varieties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Waitau,
    Hakka,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Waitau, Language::Hakka];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Waitau => "waitau",
            Language::Hakka => "hakka",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waitau" => Ok(Language::Waitau),
            "hakka" => Ok(Language::Hakka),
            _ => Err(UnknownName(s.to_string())),
        }
    }
}

/// Voice of a trained model. Each (language, voice) pair is a separate model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Male,
    Female,
}

impl Voice {
    pub const ALL: [Voice; 2] = [Voice::Male, Voice::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Male => "male",
            Voice::Female => "female",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Voice::Male),
            "female" => Ok(Voice::Female),
            _ => Err(UnknownName(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown name '{0}'")]
pub struct UnknownName(pub String);

/// Cache key of a loaded model, displayed as `{language}_{voice}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub language: Language,
    pub voice: Voice,
}

impl ModelKey {
    pub fn new(language: Language, voice: Voice) -> Self {
        Self { language, voice }
    }

    /// Every (language, voice) pair the service can serve
    pub fn all() -> impl Iterator<Item = ModelKey> {
        Language::ALL
            .into_iter()
            .flat_map(|language| Voice::ALL.into_iter().map(move |voice| ModelKey { language, voice }))
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.language, self.voice)
    }
}

impl FromStr for ModelKey {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (language, voice) = s.split_once('_').ok_or_else(|| UnknownName(s.to_string()))?;
        Ok(ModelKey {
            language: language.parse()?,
            voice: voice.parse()?,
        })
    }
}
