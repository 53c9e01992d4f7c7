use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;
use storekit_core::error::{Error, Result};
use storekit_core::types::{Page, Section, SectionKind, SiteLayout, slugify};

/// Render the canonical layout into the workspace source tree: one routed
/// page module per page, one renderer module per distinct section kind.
/// Deterministic given the same canonical layout.
pub fn synthesize(workspace: &Path, site: &SiteLayout) -> Result<()> {
    let write = |rel: String, contents: String| -> Result<()> {
        let path = workspace.join(&rel);
        fs::write(&path, contents)
            .map_err(|e| Error::Scaffold(format!("writing {}: {}", path.display(), e)))
    };

    write("src/components/esc.js".into(), ESC_HELPER.into())?;

    // One renderer per kind, emitted once. Unknown kinds share the fallback.
    let mut kinds: BTreeSet<String> = BTreeSet::new();
    let mut needs_fallback = false;
    for page in &site.pages {
        for section in &page.sections {
            if section.kind.is_known() {
                kinds.insert(section.kind.tag().to_string());
            } else {
                needs_fallback = true;
            }
        }
    }
    for tag in &kinds {
        let source = renderer_source(&SectionKind::from_tag(tag));
        write(format!("src/components/{}.js", tag), source.into())?;
    }
    if needs_fallback {
        write("src/components/fallback.js".into(), FALLBACK_RENDERER.into())?;
    }

    let link_targets = LinkTargets::from_site(site);
    let mut stems: HashSet<String> = HashSet::new();
    for page in &site.pages {
        let module = page_module(page, &link_targets);
        write(
            format!("src/pages/{}.js", page_file_stem(page, &mut stems)),
            module,
        )?;
    }

    tracing::debug!(
        pages = site.pages.len(),
        renderers = kinds.len(),
        "site sources synthesized"
    );
    Ok(())
}

/// Module filename for a page. Path segments stay visible in the stem
/// (`/shop/sale` becomes `shop-sale`) and stems are de-duplicated so two
/// distinct paths can never overwrite each other's module.
fn page_file_stem(page: &Page, seen: &mut HashSet<String>) -> String {
    let base = if page.path == "/" {
        "index".to_string()
    } else {
        page.path.trim_start_matches('/').replace('/', "-")
    };
    if seen.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn renderer_name(kind: &SectionKind) -> &str {
    if kind.is_known() { kind.tag() } else { "fallback" }
}

/// Generate one page module: renderer imports, embedded section data, and a
/// `render()` producing the full HTML document.
fn page_module(page: &Page, targets: &LinkTargets) -> String {
    let mut used: BTreeSet<String> = BTreeSet::new();
    for section in &page.sections {
        used.insert(renderer_name(&section.kind).to_string());
    }
    let imports: String = used
        .iter()
        .map(|name| format!("  \"{0}\": require(\"../components/{0}\"),\n", name))
        .collect();

    let mut entries = String::new();
    for section in &page.sections {
        let data = section_data(section, targets);
        entries.push_str(&format!(
            "  {{ renderer: \"{}\", section: {} }},\n",
            renderer_name(&section.kind),
            js_json(&data)
        ));
    }

    format!(
        r#"const esc = require("../components/esc");
const renderers = {{
{imports}}};

const sections = [
{entries}];

module.exports = {{
  path: {path},
  name: {name},
  render() {{
    const body = sections
      .map((s) => renderers[s.renderer](s.section))
      .join("\n");
    return `<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>${{esc(module.exports.name)}}</title>
<link rel="stylesheet" href="/styles.css">
</head>
<body>
${{body}}
</body>
</html>
`;
  }},
}};
"#,
        imports = imports,
        entries = entries,
        path = js_json(&Value::String(page.path.clone())),
        name = js_json(&Value::String(page.name.clone())),
    )
}

/// Section payload as handed to its renderer, with internal links rewritten
/// to normalized page paths.
fn section_data(section: &Section, targets: &LinkTargets) -> Value {
    let mut map = section.fields.clone();
    map.insert("id".into(), Value::String(section.id.clone()));
    map.insert("kind".into(), Value::String(section.kind.tag().to_string()));
    if let Some(variant) = &section.variant {
        map.insert("variant".into(), Value::String(variant.clone()));
    }
    let mut value = Value::Object(map);
    rewrite_links(&mut value, targets);
    value
}

/// Serialize a JSON value for embedding in generated JS source. JSON is a
/// JS subset except for U+2028/U+2029, which must be escaped.
fn js_json(value: &Value) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Resolution table for internal navigation: normalized paths plus name
/// slugs, both mapping to the canonical page path.
struct LinkTargets {
    by_key: HashMap<String, String>,
}

impl LinkTargets {
    fn from_site(site: &SiteLayout) -> Self {
        let mut by_key = HashMap::new();
        for page in &site.pages {
            by_key.insert(page.path.clone(), page.path.clone());
            by_key.insert(slugify(&page.name), page.path.clone());
        }
        LinkTargets { by_key }
    }

    /// Map a user-provided link target onto a known page path. External
    /// http(s)/mailto links pass through; anything else resolves to a real
    /// page or falls back to the home page, never an arbitrary string.
    fn resolve(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://")
            || lower.starts_with("https://")
            || lower.starts_with("mailto:")
        {
            return trimmed.to_string();
        }
        if let Some(path) = self.by_key.get(trimmed) {
            return path.clone();
        }
        let slug = slugify(trimmed.trim_start_matches('/'));
        if let Some(path) = self.by_key.get(&slug) {
            return path.clone();
        }
        "/".to_string()
    }
}

/// Rewrite `href`/`link` string fields anywhere inside a section payload.
fn rewrite_links(value: &mut Value, targets: &LinkTargets) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if (key == "href" || key == "link")
                    && let Value::String(s) = v
                {
                    *s = targets.resolve(s);
                } else {
                    rewrite_links(v, targets);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_links(item, targets);
            }
        }
        _ => {}
    }
}

const ESC_HELPER: &str = r#"module.exports = function esc(value) {
  return String(value ?? "")
    .replace(/&/g, "&amp;")
    .replace(/</g, "&lt;")
    .replace(/>/g, "&gt;")
    .replace(/"/g, "&quot;")
    .replace(/'/g, "&#x27;");
};
"#;

/// Fallback for kinds outside the catalog: nothing visible in production,
/// and never the raw section payload.
const FALLBACK_RENDERER: &str = r#"const esc = require("./esc");
module.exports = function fallback(section) {
  return "<!-- unsupported section: " + esc(section.kind).replace(/--/g, "- -") + " -->";
};
"#;

/// Renderer module source for a catalog kind. Total over the catalog; the
/// default branch exists so a future catalog addition cannot silently emit
/// raw data.
fn renderer_source(kind: &SectionKind) -> &'static str {
    match kind {
        SectionKind::Navbar => {
            r#"const esc = require("./esc");
module.exports = function navbar(section) {
  const links = Array.isArray(section.links) ? section.links : [];
  const items = links
    .map((l) => `<a href="${esc(l.href)}">${esc(l.label)}</a>`)
    .join("");
  return `<nav>${items}</nav>\n<main>`;
};
"#
        }
        SectionKind::Hero => {
            r#"const esc = require("./esc");
module.exports = function hero(section) {
  const cta = section.cta
    ? `<p><a class="cta" href="${esc(section.ctaHref || "/")}">${esc(section.cta)}</a></p>`
    : "";
  return `<section class="hero" id="${esc(section.id)}">
<h1>${esc(section.title)}</h1>
<p>${esc(section.subtitle || section.body || "")}</p>
${cta}</section>`;
};
"#
        }
        SectionKind::Features => {
            r#"const esc = require("./esc");
module.exports = function features(section) {
  const items = Array.isArray(section.items) ? section.items : [];
  const cells = items
    .map((i) => `<div><h3>${esc(i.title)}</h3><p>${esc(i.body || i.description || "")}</p></div>`)
    .join("");
  return `<section class="features" id="${esc(section.id)}">
<h2>${esc(section.title || "Features")}</h2>
<div class="grid">${cells}</div></section>`;
};
"#
        }
        SectionKind::Products => {
            r#"const esc = require("./esc");
module.exports = function products(section) {
  const items = Array.isArray(section.items) ? section.items : [];
  const cards = items
    .map(
      (p) => `<div class="card">
${p.image ? `<img src="${esc(p.image)}" alt="${esc(p.name)}">` : ""}
<h3>${esc(p.name)}</h3>
<p>${esc(p.price || "")}</p></div>`
    )
    .join("");
  return `<section class="products" id="${esc(section.id)}">
<h2>${esc(section.title || "Products")}</h2>
<div class="grid">${cards}</div></section>`;
};
"#
        }
        SectionKind::Gallery => {
            r#"const esc = require("./esc");
module.exports = function gallery(section) {
  const images = Array.isArray(section.images) ? section.images : [];
  const cells = images
    .map((img) => `<img src="${esc(img.url || img)}" alt="${esc(img.alt || "")}">`)
    .join("");
  return `<section class="gallery" id="${esc(section.id)}"><div class="grid">${cells}</div></section>`;
};
"#
        }
        SectionKind::Testimonials => {
            r#"const esc = require("./esc");
module.exports = function testimonials(section) {
  const items = Array.isArray(section.items) ? section.items : [];
  const quotes = items
    .map((t) => `<blockquote>${esc(t.quote || t.body || "")}<cite>${esc(t.author || "")}</cite></blockquote>`)
    .join("");
  return `<section class="testimonials" id="${esc(section.id)}">${quotes}</section>`;
};
"#
        }
        SectionKind::Cta => {
            r#"const esc = require("./esc");
module.exports = function cta(section) {
  return `<section class="cta" id="${esc(section.id)}">
<h2>${esc(section.title || "")}</h2>
<a href="${esc(section.href || "/")}">${esc(section.label || section.title || "Learn more")}</a>
</section>`;
};
"#
        }
        SectionKind::Contact => {
            r#"const esc = require("./esc");
module.exports = function contact(section) {
  return `<section class="contact" id="${esc(section.id)}">
<h2>${esc(section.title || "Contact")}</h2>
<p>${esc(section.body || "")}</p>
${section.email ? `<p><a href="mailto:${esc(section.email)}">${esc(section.email)}</a></p>` : ""}
</section>`;
};
"#
        }
        SectionKind::Footer => {
            r#"const esc = require("./esc");
module.exports = function footer(section) {
  return `</main>\n<footer>${esc(section.text || "")}</footer>`;
};
"#
        }
        // Textblock doubles as the default for anything the catalog grows.
        SectionKind::Textblock | SectionKind::Unknown(_) => {
            r#"const esc = require("./esc");
module.exports = function textblock(section) {
  return `<section class="textblock" id="${esc(section.id)}">
<h2>${esc(section.title || "")}</h2>
<p>${esc(section.body || "")}</p>
</section>`;
};
"#
        }
    }
}
