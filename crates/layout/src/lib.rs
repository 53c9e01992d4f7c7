//! Layout normalization: turns an untrusted, possibly malformed layout
//! document into a canonical [`SiteLayout`] the rest of the pipeline can
//! rely on, or a `Layout` error. Never panics on any input.

pub mod repair;

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use storekit_core::error::{Error, Result};
use storekit_core::types::{Page, Section, SectionKind, SiteLayout, slugify};

/// Core pages every storefront gets, synthesized when the document lacks them.
const CORE_PAGES: &[(&str, &str)] = &[
    ("Home", "/"),
    ("About", "/about"),
    ("Contact", "/contact"),
    ("Products", "/products"),
];

/// Parse and normalize a raw layout document.
///
/// `store_name` seeds placeholder copy for synthesized pages, so repeated
/// normalization of the same store produces byte-identical output.
pub fn parse_layout(raw: Option<&str>, store_name: &str) -> Result<SiteLayout> {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Err(Error::Layout("no layout document".into())),
    };

    let value = repair::parse_with_repair(raw).map_err(|reason| {
        tracing::debug!(%reason, "layout unparsable after repair");
        Error::Layout("unparsable".into())
    })?;

    normalize(value, store_name)
}

/// Normalize an already-parsed layout value. Exposed separately so callers
/// holding structured (non-string) layouts skip the repair ladder.
pub fn normalize(value: Value, store_name: &str) -> Result<SiteLayout> {
    let root = match value {
        Value::Object(map) => map,
        _ => return Err(Error::Layout("layout root must be an object".into())),
    };

    // A bare {"sections": [...]} is a single home page.
    let raw_pages: Vec<Value> = match root.get("pages") {
        Some(Value::Array(pages)) => pages.clone(),
        _ if root.contains_key("sections") => {
            vec![json!({
                "name": "Home",
                "path": "/",
                "sections": root.get("sections").cloned().unwrap_or(json!([])),
            })]
        }
        _ => Vec::new(),
    };

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_paths: HashSet<String> = HashSet::new();
    let mut pages: Vec<Page> = Vec::new();

    for (page_idx, raw_page) in raw_pages.into_iter().enumerate() {
        let Value::Object(obj) = raw_page else {
            continue;
        };
        pages.push(normalize_page(
            obj,
            page_idx,
            &mut seen_ids,
            &mut seen_paths,
        ));
    }

    let mut seed = Seed::new(store_name);
    ensure_core_pages(&mut pages, &mut seen_ids, &mut seen_paths, &mut seed);
    for page in &mut pages {
        bracket_page(page, &mut seen_ids);
    }
    rebuild_navbars(&mut pages);

    Ok(SiteLayout { pages })
}

fn normalize_page(
    obj: Map<String, Value>,
    page_idx: usize,
    seen_ids: &mut HashSet<String>,
    seen_paths: &mut HashSet<String>,
) -> Page {
    let name = match obj.get("name").and_then(Value::as_str) {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => format!("Page {}", page_idx + 1),
    };

    let path = match obj.get("path").and_then(Value::as_str) {
        Some(p) if !p.trim().is_empty() => normalize_path(p),
        _ => path_from_name(&name),
    };
    let path = dedupe_path(path, seen_paths);

    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let mut sections = Vec::new();
    if let Some(Value::Array(raw_sections)) = obj.get("sections") {
        for (section_idx, raw) in raw_sections.iter().enumerate() {
            let Value::Object(fields) = raw else {
                continue;
            };
            sections.push(normalize_section(
                fields.clone(),
                page_idx,
                section_idx,
                seen_ids,
            ));
        }
    }

    Page {
        name,
        path,
        description,
        sections,
    }
}

fn normalize_section(
    mut fields: Map<String, Value>,
    page_idx: usize,
    section_idx: usize,
    seen_ids: &mut HashSet<String>,
) -> Section {
    // Absent or non-string tags default to textblock; unrecognized strings
    // are preserved as Unknown and rendered via the fallback.
    let kind = match fields.remove("type") {
        Some(Value::String(tag)) if !tag.trim().is_empty() => {
            SectionKind::from_tag(tag.trim())
        }
        _ => SectionKind::Textblock,
    };

    let variant = match fields.remove("variant") {
        Some(Value::String(v)) => Some(v),
        _ => None,
    };

    let id = match fields.remove("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        _ => content_id(&kind, &fields, page_idx, section_idx),
    };
    let id = dedupe_id(id, seen_ids);

    Section {
        id,
        kind,
        variant,
        fields,
    }
}

/// Content-addressed section id: stable across re-normalizations of the
/// same document.
fn content_id(
    kind: &SectionKind,
    fields: &Map<String, Value>,
    page_idx: usize,
    section_idx: usize,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.tag().as_bytes());
    hasher.update(page_idx.to_le_bytes());
    hasher.update(section_idx.to_le_bytes());
    if let Ok(bytes) = serde_json::to_vec(fields) {
        hasher.update(&bytes);
    }
    let digest = hasher.finalize();
    format!("sec-{:012x}", u64::from_be_bytes(digest[..8].try_into().unwrap()) >> 16)
}

fn dedupe_id(id: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(id.clone()) {
        return id;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", id, n);
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Force a path into `/lower-case-slug` shape, segment by segment.
fn normalize_path(path: &str) -> String {
    let segments: Vec<String> = path
        .split('/')
        .map(slugify)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn path_from_name(name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() || slug == "home" {
        "/".to_string()
    } else {
        format!("/{}", slug)
    }
}

fn dedupe_path(path: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(path.clone()) {
        return path;
    }
    let base = if path == "/" { "/home" } else { path.as_str() };
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Synthesize any missing core page with seeded placeholder content.
fn ensure_core_pages(
    pages: &mut Vec<Page>,
    seen_ids: &mut HashSet<String>,
    seen_paths: &mut HashSet<String>,
    seed: &mut Seed,
) {
    for &(name, path) in CORE_PAGES {
        if pages.iter().any(|p| p.path == path) {
            continue;
        }
        let fields = placeholder_fields(name, seed);
        let id = dedupe_id(format!("sec-{}", slugify(name)), seen_ids);
        seen_paths.insert(path.to_string());
        pages.push(Page {
            name: name.to_string(),
            path: path.to_string(),
            description: String::new(),
            sections: vec![Section {
                id,
                kind: if name == "Products" {
                    SectionKind::Products
                } else if name == "Contact" {
                    SectionKind::Contact
                } else {
                    SectionKind::Textblock
                },
                variant: None,
                fields,
            }],
        });
    }
    // Home first, the rest in document order.
    if let Some(idx) = pages.iter().position(|p| p.path == "/") {
        let home = pages.remove(idx);
        pages.insert(0, home);
    }
}

fn placeholder_fields(page_name: &str, seed: &mut Seed) -> Map<String, Value> {
    const OPENERS: &[&str] = &[
        "Welcome to our store.",
        "Quality goods, fair prices.",
        "Thanks for stopping by.",
        "Everything we make, in one place.",
    ];
    let mut fields = Map::new();
    fields.insert("title".into(), json!(page_name));
    fields.insert("body".into(), json!(OPENERS[seed.pick(OPENERS.len())]));
    fields
}

/// Guarantee the navbar-first / footer-last bracketing: keep the first navbar
/// and first footer the document supplied, drop duplicates, inject defaults
/// when missing.
fn bracket_page(page: &mut Page, seen_ids: &mut HashSet<String>) {
    let mut navbar: Option<Section> = None;
    let mut footer: Option<Section> = None;
    let mut body: Vec<Section> = Vec::new();

    for section in page.sections.drain(..) {
        match section.kind {
            SectionKind::Navbar if navbar.is_none() => navbar = Some(section),
            SectionKind::Footer if footer.is_none() => footer = Some(section),
            SectionKind::Navbar | SectionKind::Footer => {} // duplicate, dropped
            _ => body.push(section),
        }
    }

    let navbar = navbar.unwrap_or_else(|| Section {
        id: dedupe_id(format!("nav-{}", slugify(&page.name)), seen_ids),
        kind: SectionKind::Navbar,
        variant: None,
        fields: Map::new(),
    });
    let footer = footer.unwrap_or_else(|| Section {
        id: dedupe_id(format!("foot-{}", slugify(&page.name)), seen_ids),
        kind: SectionKind::Footer,
        variant: None,
        fields: Map::new(),
    });

    page.sections.push(navbar);
    page.sections.extend(body);
    page.sections.push(footer);
}

/// Rewrite every navbar's link list to the final normalized page set.
/// Internal navigation never points at user-provided paths.
fn rebuild_navbars(pages: &mut [Page]) {
    let links: Vec<Value> = pages
        .iter()
        .map(|p| json!({"label": p.name, "href": p.path}))
        .collect();
    for page in pages.iter_mut() {
        for section in &mut page.sections {
            if section.kind == SectionKind::Navbar {
                section.fields.insert("links".into(), Value::Array(links.clone()));
            }
        }
    }
}

/// Deterministic picker seeded from the store name. Keeps placeholder copy
/// reproducible across re-runs so synthesis output is stable.
struct Seed(u64);

impl Seed {
    fn new(store_name: &str) -> Self {
        let digest = Sha256::digest(store_name.as_bytes());
        Seed(u64::from_be_bytes(digest[..8].try_into().unwrap()) | 1)
    }

    fn pick(&mut self, len: usize) -> usize {
        // xorshift64
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x % len as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(raw: &str) -> SiteLayout {
        parse_layout(Some(raw), "Test Store").unwrap()
    }

    #[test]
    fn test_absent_layout_is_an_error() {
        assert!(matches!(
            parse_layout(None, "s"),
            Err(Error::Layout(_))
        ));
        assert!(matches!(
            parse_layout(Some("   "), "s"),
            Err(Error::Layout(_))
        ));
    }

    #[test]
    fn test_null_root_is_an_error() {
        assert!(matches!(
            parse_layout(Some("null"), "s"),
            Err(Error::Layout(_))
        ));
    }

    #[test]
    fn test_empty_object_yields_core_pages() {
        let site = layout("{}");
        for path in ["/", "/about", "/contact", "/products"] {
            assert!(site.page(path).is_some(), "missing core page {path}");
        }
        assert_eq!(site.pages[0].path, "/");
    }

    #[test]
    fn test_bare_sections_become_home_page() {
        let site = layout(r#"{"sections":[{"type":"hero","title":"Hi"}]}"#);
        let home = site.page("/").unwrap();
        assert!(home.sections.iter().any(|s| s.kind == SectionKind::Hero));
    }

    #[test]
    fn test_bracketing_invariant() {
        let site = layout(
            r#"{"pages":[{"name":"Deals","sections":[
                {"type":"footer"},{"type":"hero"},{"type":"navbar"},{"type":"navbar"}
            ]}]}"#,
        );
        for page in &site.pages {
            assert_eq!(page.sections.first().unwrap().kind, SectionKind::Navbar);
            assert_eq!(page.sections.last().unwrap().kind, SectionKind::Footer);
            let navbars = page
                .sections
                .iter()
                .filter(|s| s.kind == SectionKind::Navbar)
                .count();
            let footers = page
                .sections
                .iter()
                .filter(|s| s.kind == SectionKind::Footer)
                .count();
            assert_eq!((navbars, footers), (1, 1), "page {}", page.path);
        }
    }

    #[test]
    fn test_path_invariant() {
        let site = layout(
            r#"{"pages":[
                {"name":"A","path":"shop"},
                {"name":"B","path":"/shop"},
                {"name":"C"}
            ]}"#,
        );
        let mut seen = HashSet::new();
        for page in &site.pages {
            assert!(page.path.starts_with('/'), "{}", page.path);
            assert!(seen.insert(page.path.clone()), "duplicate {}", page.path);
        }
        // "shop" and "/shop" collide after normalization; second is suffixed.
        assert!(site.page("/shop").is_some());
        assert!(site.page("/shop-2").is_some());
    }

    #[test]
    fn test_missing_type_defaults_to_textblock() {
        let site = layout(r#"{"pages":[{"name":"Home","sections":[{"title":"x"}]}]}"#);
        let home = site.page("/").unwrap();
        assert!(home
            .sections
            .iter()
            .any(|s| s.kind == SectionKind::Textblock));
    }

    #[test]
    fn test_unknown_type_preserved() {
        let site = layout(r#"{"pages":[{"name":"Home","sections":[{"type":"wizard"}]}]}"#);
        let home = site.page("/").unwrap();
        assert!(home
            .sections
            .iter()
            .any(|s| s.kind == SectionKind::Unknown("wizard".into())));
    }

    #[test]
    fn test_section_ids_unique() {
        let site = layout(
            r#"{"pages":[{"name":"Home","sections":[
                {"id":"dup","type":"hero"},{"id":"dup","type":"cta"}
            ]}]}"#,
        );
        let mut seen = HashSet::new();
        for page in &site.pages {
            for section in &page.sections {
                assert!(seen.insert(section.id.clone()), "duplicate id {}", section.id);
            }
        }
    }

    #[test]
    fn test_malformed_ai_output_scenario() {
        let raw = r#"{"pages":[{"name":"Home","sections":[{"type":"hero","title":"Hi",]}]}"#;
        let site = layout(raw);
        let home = site.page("/").unwrap();
        assert_eq!(home.name, "Home");
        assert_eq!(home.sections.first().unwrap().kind, SectionKind::Navbar);
        assert_eq!(home.sections.last().unwrap().kind, SectionKind::Footer);
        let hero = home
            .sections
            .iter()
            .find(|s| s.kind == SectionKind::Hero)
            .expect("hero survived repair");
        assert_eq!(hero.fields.get("title").unwrap(), "Hi");
    }

    #[test]
    fn test_navbar_links_point_at_normalized_paths() {
        let site = layout(
            r#"{"pages":[{"name":"Look Book","sections":[
                {"type":"navbar","links":[{"label":"evil","href":"javascript:alert(1)"}]}
            ]}]}"#,
        );
        for page in &site.pages {
            let nav = &page.sections[0];
            let links = nav.fields.get("links").unwrap().as_array().unwrap();
            assert_eq!(links.len(), site.pages.len());
            for link in links {
                let href = link["href"].as_str().unwrap();
                assert!(href.starts_with('/'), "unsafe href {href}");
            }
        }
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let a = layout("{}");
        let b = layout("{}");
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
