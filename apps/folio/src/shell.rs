//! Built-in page shell, used when the site root has no `index.html`.
//! It carries every element id and hook the renderers and navigator look for.

use tracing::{info, warn};

use crate::dom::{Document, El, View};
use crate::models::Locale;
use crate::navigator::{NAV_LINK_CLASS, SECTION_CONTAINER_ID};
use crate::notify::TOAST_ROOT_ID;
use crate::render::{
    cv_link_id, lang_button_id, EXPERIENCE_ID, HERO_PHOTO_ID, HIDDEN_CLASS, PERSONAL_INFO_ID,
    PROJECTS_ID,
};
use crate::source::AssetSource;
use crate::store::PAGE_TITLE_ID;

/// Sections offered in the nav bar: (section name, es label, en label).
const NAV_SECTIONS: &[(&str, &str, &str)] = &[
    ("sobreMi", "Sobre mí", "About me"),
    ("experiencia", "Experiencia", "Experience"),
    ("proyectos", "Proyectos", "Projects"),
    ("contacto", "Contacto", "Contact"),
    ("descargaCV", "Descargar CV", "Download CV"),
];

fn label(es: &str, en: &str) -> Vec<View> {
    vec![
        El::new("span").class("label-es").text(es).build(),
        El::new("span").class("label-en").class(HIDDEN_CLASS).text(en).build(),
    ]
}

fn hero(locale: Locale) -> El {
    let id = match locale {
        Locale::Es => "hero-text-es",
        Locale::En => "hero-text-en",
    };
    let mut block = El::new("div").id(id).class("hero-text");
    if locale != Locale::Es {
        block = block.class(HIDDEN_CLASS);
    }
    block
        .child(El::new("h2").attr("data-key", "hero_title"))
        .child(El::new("p").attr("data-key", "hero_subtitle"))
}

pub fn default_shell() -> Document {
    let mut doc = Document::new();
    let head = doc.head();
    doc.append_view(head, &El::new("meta").attr("charset", "utf-8").build());
    doc.append_view(head, &El::new("title").text("Portfolio").build());

    let nav = El::new("nav").children(NAV_SECTIONS.iter().map(|&(section, es, en)| {
        El::new("a")
            .class(NAV_LINK_CLASS)
            .attr("href", &format!("#{section}"))
            .children(label(es, en))
    }));

    let header = El::new("header")
        .child(El::new("h1").id(PAGE_TITLE_ID).class("page-title"))
        .child(nav)
        .child(
            El::new("div")
                .class("lang-toggle")
                .children(Locale::ALL.into_iter().map(|l| {
                    El::new("button")
                        .id(lang_button_id(l))
                        .attr("type", "button")
                        .text(&l.code().to_ascii_uppercase())
                })),
        );

    let main = El::new("main")
        .child(
            El::new("section")
                .class("hero")
                .child(
                    El::new("img")
                        .id(HERO_PHOTO_ID)
                        .class(HIDDEN_CLASS)
                        .attr("alt", ""),
                )
                .child(hero(Locale::Es))
                .child(hero(Locale::En))
                .child(El::new("div").id(PERSONAL_INFO_ID))
                .child(El::new("div").id(EXPERIENCE_ID))
                .child(El::new("div").id(PROJECTS_ID)),
        )
        .child(El::new("div").id(SECTION_CONTAINER_ID).class("section-container"));

    let footer = El::new("footer")
        .child(El::new("a").id("footer-email").text("Email"))
        .child(El::new("a").id("footer-linkedin").text("LinkedIn"))
        .child(El::new("a").id("footer-github").text("GitHub"))
        .children(Locale::ALL.into_iter().map(|l| {
            El::new("a")
                .id(cv_link_id(l))
                .text(&format!("CV ({})", l.code()))
        }));

    let body = doc.body();
    for view in [
        header.build(),
        main.build(),
        footer.build(),
        El::new("div")
            .id(TOAST_ROOT_ID)
            .class("toast-root")
            .attr("aria-live", "polite")
            .build(),
    ] {
        doc.append_view(body, &view);
    }
    doc
}

/// Fetches and parses the site's shell, falling back to [`default_shell`]
/// when it is missing or unparsable.
pub async fn load_shell(source: &dyn AssetSource, path: &str) -> Document {
    let markup = match source.fetch_text(path).await {
        Ok(markup) => markup,
        Err(e) => {
            warn!("No page shell at '{path}' ({e}); using the built-in shell");
            return default_shell();
        }
    };
    match Document::from_html(&markup) {
        Ok(doc) => {
            info!("Page shell loaded from '{path}'");
            doc
        }
        Err(e) => {
            warn!("Page shell '{path}' did not parse ({e}); using the built-in shell");
            default_shell()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DirSource;

    #[test]
    fn test_default_shell_carries_dom_contract() {
        let doc = default_shell();
        for id in [
            "hero-text-es",
            "hero-text-en",
            "lang-es",
            "lang-en",
            PERSONAL_INFO_ID,
            EXPERIENCE_ID,
            PROJECTS_ID,
            "download-cv-es",
            "download-cv-en",
            HERO_PHOTO_ID,
            PAGE_TITLE_ID,
            SECTION_CONTAINER_ID,
            TOAST_ROOT_ID,
        ] {
            assert!(doc.get_element_by_id(id).is_some(), "missing #{id}");
        }
        assert_eq!(doc.find_by_class(doc.root(), NAV_LINK_CLASS).len(), NAV_SECTIONS.len());
    }

    #[tokio::test]
    async fn test_load_shell_falls_back_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let doc = load_shell(&DirSource::new(dir.path()), "index.html").await;
        assert!(doc.get_element_by_id(SECTION_CONTAINER_ID).is_some());
    }

    #[tokio::test]
    async fn test_load_shell_reads_site_markup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            r#"<!DOCTYPE html><html><body><h1 id="page-title">Mine</h1></body></html>"#,
        )
        .unwrap();
        let doc = load_shell(&DirSource::new(dir.path()), "index.html").await;
        let title = doc.get_element_by_id(PAGE_TITLE_ID).unwrap();
        assert_eq!(doc.text_content(title), "Mine");
        assert!(doc.get_element_by_id(SECTION_CONTAINER_ID).is_none());
    }
}
