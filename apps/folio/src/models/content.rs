//! Content document: the single JSON object holding every localized string,
//! link and palette used by the page.
//!
//! Only invalid JSON fails a load. Each optional field is deserialized on its
//! own and a field with the wrong shape reads as absent, so one bad entry
//! never blanks the rest of the page.

use std::fmt;
use std::str::FromStr;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ────────────────────────────────────────────────────────────────────────────
// Locale
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::Es, Locale::En];

    pub fn code(self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::En => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported locale '{0}'")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Locale::Es),
            "en" => Ok(Locale::En),
            _ => Err(UnknownLocale(s.to_string())),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Global fields
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub linkedin: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub github: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvLinks {
    #[serde(default, deserialize_with = "lenient")]
    pub es: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub en: Option<String>,
}

impl CvLinks {
    pub fn get(&self, locale: Locale) -> Option<&str> {
        match locale {
            Locale::Es => self.es.as_deref(),
            Locale::En => self.en.as_deref(),
        }
        .filter(|s| !s.trim().is_empty())
    }

    /// Configured links in locale order.
    pub fn configured(&self) -> Vec<(Locale, &str)> {
        Locale::ALL
            .iter()
            .filter_map(|&l| self.get(l).map(|url| (l, url)))
            .collect()
    }
}

/// Palette description. Base colours are hex strings; slot values are used
/// verbatim when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeColors {
    #[serde(default, deserialize_with = "lenient")]
    pub primary: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub secondary: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub accent: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub soft: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub blob1: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub blob2: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub blob3: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub blob4: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub highlight1: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub highlight2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Keywords {
    Text(String),
    List(Vec<String>),
}

impl Keywords {
    pub fn joined(&self) -> String {
        match self {
            Keywords::Text(s) => s.clone(),
            Keywords::List(items) => items.join(", "),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Seo {
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub keywords: Option<Keywords>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Branding {
    #[serde(default, deserialize_with = "lenient")]
    pub favicon: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Locale section entries
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceItem {
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tech: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Education {
    Text(String),
    Entries(Vec<EducationEntry>),
}

/// A titled chip list (soft or hard skills).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkillList {
    pub title: Option<String>,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Skills {
    pub soft: SkillList,
    pub hard: SkillList,
}

impl Skills {
    pub fn is_empty(&self) -> bool {
        self.soft.items.is_empty() && self.hard.items.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LocaleSection
// ────────────────────────────────────────────────────────────────────────────

/// Per-locale subtree. Arbitrary keys feed `[data-key]` lookups; the typed
/// accessors read the structured blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleSection(Map<String, Value>);

impl LocaleSection {
    /// A non-empty string stored under `key`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn field<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Items of a list field, skipping entries with the wrong shape.
    fn list<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        let items = self.0.get(key)?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
        )
    }

    pub fn bio(&self) -> Option<String> {
        self.0
            .get("personal_info")?
            .get("bio")?
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn education(&self) -> Option<Education> {
        self.field("education").or_else(|| {
            self.0
                .get("personal_info")?
                .get("education")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
        })
    }

    /// Skill chips. A flat `soft_skills`/`hard_skills` array takes precedence
    /// over the matching list nested under `skills`.
    pub fn skills(&self) -> Skills {
        let nested = self.0.get("skills");
        let nested_list = |name: &str| -> Option<Vec<String>> {
            let items = nested?.get(name)?.as_array()?;
            Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            )
        };
        let nested_title = |name: &str| -> Option<String> {
            nested?
                .get(name)?
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let flat_list = |name: &str| -> Option<Vec<String>> { self.list::<String>(name) };

        Skills {
            soft: SkillList {
                title: self
                    .text("soft_skills_title")
                    .map(str::to_string)
                    .or_else(|| nested_title("soft_title")),
                items: flat_list("soft_skills")
                    .or_else(|| nested_list("soft"))
                    .unwrap_or_default(),
            },
            hard: SkillList {
                title: self
                    .text("hard_skills_title")
                    .map(str::to_string)
                    .or_else(|| nested_title("hard_title")),
                items: flat_list("hard_skills")
                    .or_else(|| nested_list("hard"))
                    .unwrap_or_default(),
            },
        }
    }

    pub fn experience(&self) -> Option<Vec<ExperienceItem>> {
        self.list("experience")
    }

    pub fn projects(&self) -> Option<Vec<ProjectItem>> {
        self.list("projects")
    }

    pub fn hero_photo(&self) -> Option<&str> {
        self.text("hero_photo")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ContentDocument
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDocument {
    #[serde(default, deserialize_with = "lenient")]
    pub es: Option<LocaleSection>,
    #[serde(default, deserialize_with = "lenient")]
    pub en: Option<LocaleSection>,
    #[serde(default, deserialize_with = "lenient")]
    pub contact_info: Option<ContactInfo>,
    #[serde(default, deserialize_with = "lenient")]
    pub cv_links: Option<CvLinks>,
    #[serde(default, deserialize_with = "lenient")]
    pub theme: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub theme_colors: Option<ThemeColors>,
    #[serde(default, deserialize_with = "lenient")]
    pub seo: Option<Seo>,
    #[serde(default, deserialize_with = "lenient")]
    pub branding: Option<Branding>,
    #[serde(default, deserialize_with = "lenient")]
    pub hero_photo: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub default_language: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub page_title: Option<String>,
}

impl ContentDocument {
    /// Strict JSON parse: anything that is not a JSON object fails.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn locale(&self, locale: Locale) -> Option<&LocaleSection> {
        match locale {
            Locale::Es => self.es.as_ref(),
            Locale::En => self.en.as_ref(),
        }
    }

    pub fn default_locale(&self) -> Option<Locale> {
        self.default_language.as_deref()?.parse().ok()
    }

    /// Locale override, then the document default. Empty strings count as absent.
    pub fn hero_photo_for(&self, locale: Locale) -> Option<&str> {
        let present = |s: &&str| !s.trim().is_empty();
        self.locale(locale)
            .and_then(LocaleSection::hero_photo)
            .filter(present)
            .or_else(|| self.hero_photo.as_deref().filter(present))
    }

    pub fn cv_links(&self) -> CvLinks {
        self.cv_links.clone().unwrap_or_default()
    }
}

/// Deserializes a field, mapping any shape mismatch to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
