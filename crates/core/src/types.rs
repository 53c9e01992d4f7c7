use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical site layout: what the normalizer produces and every later
/// pipeline stage consumes. Invariants (enforced by normalization, relied on
/// everywhere else): at least one page, unique page paths, every page
/// bracketed by exactly one navbar section first and one footer section last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteLayout {
    pub pages: Vec<Page>,
}

impl SiteLayout {
    /// Look up a page by its normalized path.
    pub fn page(&self, path: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.path == path)
    }
}

/// One routable page of the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub name: String,
    /// Always non-empty and `/`-prefixed after normalization.
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub sections: Vec<Section>,
}

/// One content block on a page, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Unique within the document.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Kind-specific fields (title, items, image URLs, ...), kept as-is.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Closed catalog of renderable section kinds.
///
/// Unrecognized tags are preserved in `Unknown` so a round-trip never loses
/// data, but the synthesizer renders them through a safe fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Navbar,
    Hero,
    Features,
    Products,
    Gallery,
    Testimonials,
    Cta,
    Textblock,
    Contact,
    Footer,
    Unknown(String),
}

impl SectionKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "navbar" => SectionKind::Navbar,
            "hero" => SectionKind::Hero,
            "features" => SectionKind::Features,
            "products" => SectionKind::Products,
            "gallery" => SectionKind::Gallery,
            "testimonials" => SectionKind::Testimonials,
            "cta" => SectionKind::Cta,
            "textblock" => SectionKind::Textblock,
            "contact" => SectionKind::Contact,
            "footer" => SectionKind::Footer,
            other => SectionKind::Unknown(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            SectionKind::Navbar => "navbar",
            SectionKind::Hero => "hero",
            SectionKind::Features => "features",
            SectionKind::Products => "products",
            SectionKind::Gallery => "gallery",
            SectionKind::Testimonials => "testimonials",
            SectionKind::Cta => "cta",
            SectionKind::Textblock => "textblock",
            SectionKind::Contact => "contact",
            SectionKind::Footer => "footer",
            SectionKind::Unknown(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, SectionKind::Unknown(_))
    }
}

impl Serialize for SectionKind {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for SectionKind {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(d)?;
        Ok(SectionKind::from_tag(&tag))
    }
}

/// One file of the built static site, relative to the bundle root.
#[derive(Debug, Clone)]
pub struct BundleFile {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// The complete static asset set produced by one build, already filtered
/// down to servable files.
#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    pub files: Vec<BundleFile>,
}

impl AssetBundle {
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.bytes.len()).sum()
    }
}

/// Provider-side deployment state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentState {
    Queued,
    Building,
    Ready,
    Error,
}

impl DeploymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentState::Ready | DeploymentState::Error)
    }
}

/// Snapshot of one provider deployment, as returned by status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub state: DeploymentState,
    /// Default hostname the provider resolved for this deployment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Provider-supplied diagnostic for failed builds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a successful publish hands back for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub url: String,
    pub deployment_id: String,
    pub published_at: DateTime<Utc>,
}

/// A store as read from the store repository. The layout is kept raw here;
/// the normalizer owns turning it into a `SiteLayout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    pub store_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// User-supplied custom hostname, bound best-effort alongside the stable alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

impl StoreRecord {
    /// Stable hosting-project identity for this store.
    ///
    /// Derived from the domain when present, else the display name, sanitized
    /// to provider naming rules. Must stay deterministic across republishes:
    /// this is what keeps the public URL stable even though every publish
    /// creates a brand-new deployment.
    pub fn project_name(&self) -> String {
        let source = self
            .domain
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&self.store_name);
        let slug = slugify(source);
        if slug.is_empty() {
            format!("store-{}", slugify(&self.id))
        } else {
            slug
        }
    }
}

/// Reduce a string to lowercase ASCII alphanumerics joined by single hyphens.
/// Only keep ASCII for URL safety; everything else is dropped.
pub fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' || c == '.' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
