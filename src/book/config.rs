use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;

/// Default field values shared by every book, read from a `key=value` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookConfig {
    values: HashMap<String, String>,
}

impl BookConfig {
    pub async fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read book config: {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parse book config: {}", path.display()))
    }

    /// Accepts `key=value` and `key: value` lines; `#` and `!` start
    /// comments. Later keys override earlier ones.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let mut values = HashMap::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some(split_at) = line.find(['=', ':']) else {
                anyhow::bail!("line {}: expected key=value, got {line:?}", index + 1);
            };
            let key = line[..split_at].trim();
            if key.is_empty() {
                anyhow::bail!("line {}: empty key", index + 1);
            }
            let value = line[split_at + 1..].trim();
            values.insert(key.to_owned(), value.to_owned());
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Default for `key` with `${field}` placeholders filled from `lookup`.
    pub fn default_for<'a>(&self, key: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
        self.get(key)
            .map(|template| expand(template, lookup))
            .unwrap_or_default()
    }
}

impl FromIterator<(String, String)> for BookConfig {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn expand<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                out.push_str(lookup(after[..end].trim()).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let config = BookConfig::parse(
            "# defaults\n\n! also a comment\nlanguage = English\nauthorLastName: Doe\nlanguage=German\n",
        )
        .unwrap();
        assert_eq!(config.len(), 2);
        assert_eq!(config.get("language"), Some("German"));
        assert_eq!(config.get("authorLastName"), Some("Doe"));
    }

    #[test]
    fn parse_keeps_separators_inside_values() {
        let config = BookConfig::parse("description=<p>a=b: c</p>\n").unwrap();
        assert_eq!(config.get("description"), Some("<p>a=b: c</p>"));
    }

    #[test]
    fn parse_rejects_lines_without_separator() {
        let err = BookConfig::parse("language English").unwrap_err();
        assert!(format!("{err:#}").contains("line 1"));
    }

    #[tokio::test]
    async fn read_loads_the_file_and_names_it_on_error() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("books.conf");
        tokio::fs::write(&path, "language=English\n").await?;
        let config = BookConfig::read(&path).await?;
        assert_eq!(config.get("language"), Some("English"));

        let missing = temp.path().join("missing.conf");
        let err = BookConfig::read(&missing).await.unwrap_err();
        assert!(format!("{err:#}").contains("read book config"));
        assert!(format!("{err:#}").contains("missing.conf"));
        Ok(())
    }

    #[test]
    fn defaults_expand_placeholders() {
        let config = BookConfig::parse("title=${name}'s Big Day\nsubtitle=${missing}\n").unwrap();
        let lookup = |key: &str| (key == "name").then_some("Ada");
        assert_eq!(config.default_for("title", lookup), "Ada's Big Day");
        assert_eq!(config.default_for("subtitle", lookup), "");
        assert_eq!(config.default_for("absent", lookup), "");
    }

    #[test]
    fn unterminated_placeholder_is_kept_verbatim() {
        assert_eq!(expand("a ${b", |_| Some("x")), "a ${b");
    }
}
