//! Server-side resource paths
//!
//! Midas has no path-addressed API, so resources are located by walking the
//! hierarchy from the home folder of a user or a community:
//!
//! ```text
//! path  := "/users/" <first> "_" <last> "/" {folder "/"} name
//!        | "/communities/" <community> "/" {folder "/"} name
//! ```

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use super::errors::DomainError;
use super::newtypes::{FolderId, ItemId};

/// Whose tree a server path starts from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPathOwner {
    /// A user, addressed by first and last name
    User { firstname: String, lastname: String },
    /// A community, addressed by name
    Community { name: String },
}

/// A parsed absolute server path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPath {
    raw: String,
    owner: ServerPathOwner,
    folders: Vec<String>,
    name: String,
}

impl ServerPath {
    /// Parses a server path
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidServerPath`] if the path does not start with
    /// `/users/` or `/communities/`, if the user segment is not `first_last`,
    /// or if no resource name follows the owner.
    pub fn parse(path: &str) -> Result<Self, DomainError> {
        let invalid = |reason: &str| DomainError::InvalidServerPath(format!("{path}: {reason}"));

        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| invalid("must be absolute"))?;
        let mut parts: Vec<&str> = rest.trim_end_matches('/').split('/').collect();

        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("empty path component"));
        }
        if parts.len() < 3 {
            return Err(invalid("expected an owner followed by a resource name"));
        }

        let kind = parts.remove(0);
        let owner_segment = parts.remove(0);
        let owner = match kind {
            "users" => {
                let (firstname, lastname) = owner_segment
                    .split_once('_')
                    .filter(|(f, l)| !f.is_empty() && !l.is_empty() && !l.contains('_'))
                    .ok_or_else(|| invalid("user must be written as <firstname>_<lastname>"))?;
                ServerPathOwner::User {
                    firstname: firstname.to_string(),
                    lastname: lastname.to_string(),
                }
            }
            "communities" => ServerPathOwner::Community {
                name: owner_segment.to_string(),
            },
            _ => return Err(invalid("must start with /users/ or /communities/")),
        };

        // `parts` is non-empty here: at least one component follows the owner.
        let name = parts.pop().unwrap_or_default().to_string();

        Ok(Self {
            raw: path.to_string(),
            owner,
            folders: parts.into_iter().map(str::to_string).collect(),
            name,
        })
    }

    pub fn owner(&self) -> &ServerPathOwner {
        &self.owner
    }

    /// Intermediate folder names between the owner's root folder and the target
    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    /// Name of the target folder or item
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Display for ServerPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for ServerPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A resolved server resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Folder(FolderId),
    Item(ItemId),
}
