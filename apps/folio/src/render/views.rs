//! Card, chip and block builders for the locale-rendered regions.

use crate::dom::{El, View};
use crate::models::content::{Education, ExperienceItem, ProjectItem, SkillList, Skills};
use crate::models::Locale;
use crate::render::tech::known_techs;

pub const MAX_PROJECT_COLUMNS: usize = 3;

/// Default call-to-action label on project cards.
pub fn project_cta_label(locale: Locale) -> &'static str {
    match locale {
        Locale::Es => "Ver proyecto",
        Locale::En => "View project",
    }
}

fn default_skill_titles(locale: Locale) -> (&'static str, &'static str) {
    match locale {
        Locale::Es => ("Habilidades blandas", "Habilidades técnicas"),
        Locale::En => ("Soft skills", "Technical skills"),
    }
}

fn education_title(locale: Locale) -> &'static str {
    match locale {
        Locale::Es => "Formación",
        Locale::En => "Education",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Personal info
// ────────────────────────────────────────────────────────────────────────────

/// Bio paragraph, education block and the two-column skill chip grid.
/// Blocks without data are left out; an entirely empty result means the
/// caller should leave the container untouched.
pub fn personal_info(
    locale: Locale,
    bio: Option<&str>,
    education: Option<&Education>,
    skills: &Skills,
) -> Vec<View> {
    let mut views = Vec::new();

    if let Some(bio) = bio {
        views.push(El::new("p").class("bio").text(bio).build());
    }

    if let Some(education) = education {
        let body = match education {
            Education::Text(text) => El::new("p").class("education-text").text(text).build(),
            Education::Entries(entries) => El::new("ul")
                .class("education-list")
                .children(entries.iter().map(|entry| {
                    let mut li = El::new("li")
                        .class("education-item")
                        .child(El::new("strong").text(&entry.degree))
                        .child(El::new("span").class("institution").text(&entry.institution));
                    if let Some(period) = entry.period.as_deref().filter(|p| !p.is_empty()) {
                        li = li.child(El::new("span").class("period").text(period));
                    }
                    li
                }))
                .build(),
        };
        views.push(
            El::new("div")
                .class("education")
                .child(El::new("h4").text(education_title(locale)))
                .child(body)
                .build(),
        );
    }

    if !skills.is_empty() {
        let (soft_default, hard_default) = default_skill_titles(locale);
        views.push(
            El::new("div")
                .class("skills-grid")
                .child(skill_column("soft", &skills.soft, soft_default))
                .child(skill_column("hard", &skills.hard, hard_default))
                .build(),
        );
    }

    views
}

fn skill_column(kind: &str, list: &SkillList, default_title: &str) -> El {
    let title = list.title.as_deref().unwrap_or(default_title);
    El::new("div")
        .class("skill-column")
        .attr("data-skill-kind", kind)
        .child(El::new("h4").text(title))
        .child(
            El::new("ul")
                .class("chip-list")
                .children(list.items.iter().map(|s| El::new("li").class("chip").text(s))),
        )
}

// ────────────────────────────────────────────────────────────────────────────
// Experience
// ────────────────────────────────────────────────────────────────────────────

/// One card per entry, in source order.
pub fn experience_cards(items: &[ExperienceItem]) -> Vec<View> {
    items
        .iter()
        .map(|item| {
            let meta = match (item.company.is_empty(), item.period.is_empty()) {
                (false, false) => format!("{} | {}", item.company, item.period),
                (false, true) => item.company.clone(),
                (true, false) => item.period.clone(),
                (true, true) => String::new(),
            };
            El::new("div")
                .class("experience-card")
                .child(El::new("h3").class("position").text(&item.position))
                .child(El::new("p").class("company").text(&meta))
                .child(El::new("p").class("description").text(&item.description))
                .build()
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Projects
// ────────────────────────────────────────────────────────────────────────────

/// Column count for the project grid: `min(count, 3)`.
pub fn project_columns(count: usize) -> usize {
    count.min(MAX_PROJECT_COLUMNS)
}

/// The responsive grid wrapping every project card.
pub fn project_grid(projects: &[ProjectItem], cta_label: &str) -> View {
    let columns = project_columns(projects.len());
    El::new("div")
        .class("projects-grid")
        .class(&format!("cols-{columns}"))
        .attr("data-columns", &columns.to_string())
        .children(projects.iter().map(|p| project_card(p, cta_label)))
        .build()
}

fn project_card(project: &ProjectItem, cta_label: &str) -> El {
    let mut card = El::new("article").class("project-card");

    if let Some(image) = project.image.as_deref().filter(|i| !i.trim().is_empty()) {
        card = card.child(
            El::new("img")
                .class("project-image")
                .attr("src", image)
                .attr("alt", &project.title)
                .attr("loading", "lazy"),
        );
    }

    card = card
        .child(El::new("h3").class("project-title").text(&project.title))
        .child(El::new("p").class("project-description").text(&project.description));

    let techs = known_techs(&project.tech);
    if !techs.is_empty() {
        card = card.child(El::new("div").class("tech-row").children(techs.iter().map(|t| {
            El::new("span")
                .class("tech-chip")
                .attr("title", t.name)
                .child(El::new("img").attr("src", t.icon).attr("alt", t.name))
                .child(El::new("span").text(t.name))
        })));
    }

    if let Some(link) = project.link.as_deref().filter(|l| !l.trim().is_empty()) {
        card = card.child(
            El::new("a")
                .class("project-cta")
                .attr("href", link)
                .external()
                .text(cta_label),
        );
    }

    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn project(title: &str, tech: &[&str]) -> ProjectItem {
        ProjectItem {
            title: title.to_string(),
            description: format!("{title} description"),
            link: Some(format!("https://example.com/{title}")),
            image: None,
            tech: tech.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn render(views: &[View]) -> String {
        let mut doc = Document::new();
        let body = doc.body();
        doc.replace_children(body, views);
        doc.inner_html(body)
    }

    #[test]
    fn test_project_columns_cap_at_three() {
        assert_eq!(project_columns(0), 0);
        assert_eq!(project_columns(1), 1);
        assert_eq!(project_columns(2), 2);
        assert_eq!(project_columns(3), 3);
        assert_eq!(project_columns(7), 3);
    }

    #[test]
    fn test_project_card_omits_unknown_tech_and_missing_image() {
        let grid = project_grid(&[project("folio", &["Rust", "Brainfuck"])], "View project");
        let html = render(&[grid]);
        assert!(html.contains(r#"class="projects-grid cols-1" data-columns="1""#));
        assert!(html.contains("assets/icons/rust.svg"));
        assert!(!html.contains("Brainfuck"));
        assert!(!html.contains("project-image"));
        assert!(html.contains(r#"target="_blank" rel="noopener noreferrer">View project</a>"#));
    }

    #[test]
    fn test_project_without_known_tech_has_no_chip_row() {
        let html = render(&[project_grid(&[project("a", &["Unknown"])], "Ver proyecto")]);
        assert!(!html.contains("tech-row"));
    }

    #[test]
    fn test_experience_cards_preserve_order_and_escape() {
        let items = vec![
            ExperienceItem {
                position: "Lead <dev>".into(),
                company: "Acme".into(),
                period: "2020-2023".into(),
                description: "Built things".into(),
            },
            ExperienceItem {
                position: "Intern".into(),
                company: "Beta".into(),
                period: String::new(),
                description: String::new(),
            },
        ];
        let html = render(&experience_cards(&items));
        let first = html.find("Lead &lt;dev&gt;").unwrap();
        let second = html.find("Intern").unwrap();
        assert!(first < second);
        assert!(html.contains("Acme | 2020-2023"));
        assert!(html.contains(r#"<p class="company">Beta</p>"#));
    }

    #[test]
    fn test_personal_info_uses_default_titles_and_skips_empty_blocks() {
        let skills = Skills {
            soft: SkillList {
                title: None,
                items: vec!["Teamwork".into()],
            },
            hard: SkillList {
                title: Some("Stack".into()),
                items: vec!["Rust".into()],
            },
        };
        let html = render(&personal_info(Locale::En, Some("Hi"), None, &skills));
        assert!(html.starts_with(r#"<p class="bio">Hi</p>"#));
        assert!(html.contains("<h4>Soft skills</h4>"));
        assert!(html.contains("<h4>Stack</h4>"));
        assert!(!html.contains("education"));

        assert!(personal_info(Locale::Es, None, None, &Skills::default()).is_empty());
    }
}
