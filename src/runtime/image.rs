//! Image reference parsing for pull requests.

/// Tag used when a reference names none.
pub const DEFAULT_TAG: &str = "latest";

/// An image reference split the way the engine's pull endpoint expects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Repository including any registry host, e.g. `localhost:5000/app`.
    pub repository: String,
    pub tag: Option<String>,
    /// Content digest, e.g. `sha256:...`.
    pub digest: Option<String>,
}

impl ImageRef {
    /// Parse `repo[:tag][@digest]`.
    ///
    /// A colon only starts a tag when it comes after the last `/`, so a
    /// registry port is not mistaken for one.
    pub fn parse(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        let (name, digest) = match reference.split_once('@') {
            Some((name, digest)) if !digest.is_empty() => (name, Some(digest.to_string())),
            Some(_) => return None,
            None => (reference, None),
        };

        let slash = name.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (repository, tag) = match name[slash..].rfind(':') {
            Some(i) => {
                let split = slash + i;
                let tag = &name[split + 1..];
                if tag.is_empty() {
                    return None;
                }
                (&name[..split], Some(tag.to_string()))
            }
            None => (name, None),
        };

        if repository.is_empty() {
            return None;
        }

        Some(Self {
            repository: repository.to_string(),
            tag,
            digest,
        })
    }

    /// The `fromImage` parameter for a pull.
    pub fn from_image(&self) -> String {
        match &self.digest {
            Some(digest) => format!("{}@{}", self.repository, digest),
            None => self.repository.clone(),
        }
    }

    /// The `tag` parameter for a pull; empty when pinned by digest.
    pub fn pull_tag(&self) -> String {
        if self.digest.is_some() {
            return String::new();
        }
        self.tag.clone().unwrap_or_else(|| DEFAULT_TAG.to_string())
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}
