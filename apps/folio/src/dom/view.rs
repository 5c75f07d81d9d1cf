//! Typed markup construction.
//!
//! Content-document strings only ever enter the page as text nodes or
//! attribute values, both escaped on serialization. URL-bearing attributes
//! additionally reject script schemes.

/// A node to be built into a [`super::Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Element(El),
    Text(String),
}

/// Element builder.
#[derive(Debug, Clone, PartialEq)]
pub struct El {
    pub(crate) tag: &'static str,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) children: Vec<View>,
}

impl El {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(mut self, class: &str) -> Self {
        match self.attrs.iter_mut().find(|(k, _)| k == "class") {
            Some((_, v)) => {
                v.push(' ');
                v.push_str(class);
            }
            None => self.attrs.push(("class".to_string(), class.to_string())),
        }
        self
    }

    /// Sets an attribute. `href`/`src` values pass through [`safe_url`].
    pub fn attr(mut self, name: &'static str, value: &str) -> Self {
        let value = match name {
            "href" | "src" => safe_url(value),
            _ => value.to_string(),
        };
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
        self
    }

    /// Adds `target="_blank"` with a safe `rel`.
    pub fn external(self) -> Self {
        self.attr("target", "_blank").attr("rel", "noopener noreferrer")
    }

    pub fn text(mut self, text: &str) -> Self {
        self.children.push(View::Text(text.to_string()));
        self
    }

    pub fn child(mut self, child: impl Into<View>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, V>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<View>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> View {
        View::Element(self)
    }
}

impl From<El> for View {
    fn from(el: El) -> Self {
        View::Element(el)
    }
}

/// Neutralizes `javascript:`, `vbscript:` and `data:` URLs (except images).
pub fn safe_url(url: &str) -> String {
    let trimmed = url.trim();
    let scheme: String = trimmed
        .chars()
        .take_while(|c| *c != ':')
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    let has_scheme = trimmed.contains(':') && scheme.len() < trimmed.len();
    let blocked = has_scheme
        && match scheme.as_str() {
            "javascript" | "vbscript" => true,
            "data" => !trimmed.to_ascii_lowercase().starts_with("data:image/"),
            _ => false,
        };
    if blocked {
        "#".to_string()
    } else {
        trimmed.to_string()
    }
}
