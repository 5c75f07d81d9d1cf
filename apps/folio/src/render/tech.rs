//! Technology chips for project cards. Names are matched case-insensitively
//! against a fixed vocabulary; anything unknown is left out.

/// Fixed technology vocabulary for project chips: display name, accepted
/// spellings (lowercase), icon asset.
const TECH_ICONS: &[(&str, &[&str], &str)] = &[
    ("HTML", &["html", "html5"], "assets/icons/html5.svg"),
    ("CSS", &["css", "css3"], "assets/icons/css3.svg"),
    ("JavaScript", &["javascript", "js"], "assets/icons/javascript.svg"),
    ("TypeScript", &["typescript", "ts"], "assets/icons/typescript.svg"),
    ("React", &["react", "reactjs", "react.js"], "assets/icons/react.svg"),
    ("Vue", &["vue", "vuejs", "vue.js"], "assets/icons/vue.svg"),
    ("Angular", &["angular"], "assets/icons/angular.svg"),
    ("Node.js", &["node", "nodejs", "node.js"], "assets/icons/nodejs.svg"),
    ("Tailwind", &["tailwind", "tailwindcss"], "assets/icons/tailwind.svg"),
    ("Python", &["python"], "assets/icons/python.svg"),
    ("Java", &["java"], "assets/icons/java.svg"),
    ("Rust", &["rust"], "assets/icons/rust.svg"),
    ("Go", &["go", "golang"], "assets/icons/go.svg"),
    ("PHP", &["php"], "assets/icons/php.svg"),
    ("Docker", &["docker"], "assets/icons/docker.svg"),
    ("Git", &["git"], "assets/icons/git.svg"),
    ("PostgreSQL", &["postgresql", "postgres"], "assets/icons/postgresql.svg"),
    ("MySQL", &["mysql"], "assets/icons/mysql.svg"),
    ("MongoDB", &["mongodb", "mongo"], "assets/icons/mongodb.svg"),
    ("Firebase", &["firebase"], "assets/icons/firebase.svg"),
    ("Figma", &["figma"], "assets/icons/figma.svg"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TechIcon {
    pub name: &'static str,
    pub icon: &'static str,
}

/// Looks a technology name up in the vocabulary (case-insensitive).
pub fn tech_icon(name: &str) -> Option<TechIcon> {
    let needle = name.trim().to_lowercase();
    TECH_ICONS
        .iter()
        .find(|(_, aliases, _)| aliases.contains(&needle.as_str()))
        .map(|&(name, _, icon)| TechIcon { name, icon })
}

/// Known technologies in source order; unknown names are dropped.
pub fn known_techs(names: &[String]) -> Vec<TechIcon> {
    let mut out: Vec<TechIcon> = Vec::new();
    for icon in names.iter().filter_map(|n| tech_icon(n)) {
        if !out.contains(&icon) {
            out.push(icon);
        }
    }
    out
}
