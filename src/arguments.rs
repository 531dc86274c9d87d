//! Typed, index-based access to the tokens of a single command invocation

use std::fmt;

use crate::commands::error::{ArgumentType, CommandError};
use crate::source::Server;

/// The tokens passed to a command, after routing has stripped the labels of
/// any parent commands.
///
/// Tokens are parsed lazily: every typed getter converts on demand and leaves
/// the underlying list untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    args: Vec<String>,
}

impl Arguments {
    #[must_use]
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    /// Returns all the arguments
    #[must_use]
    pub fn get(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.args.clone()
    }

    /// Arguments with the first token removed, used when descending into a child.
    #[must_use]
    pub(crate) fn tail(&self) -> Arguments {
        Arguments {
            args: self.args.iter().skip(1).cloned().collect(),
        }
    }

    fn raw(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Returns the string at the specified index.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::IndexOutOfBounds` if there is no token at `index`.
    pub fn get_string(&self, index: usize) -> Result<&str, CommandError> {
        self.raw(index).ok_or(CommandError::IndexOutOfBounds {
            index,
            size: self.args.len(),
        })
    }

    fn parse_integer(&self, index: usize) -> Option<i32> {
        self.raw(index)?.parse().ok()
    }

    /// Parses and returns an integer at the specified index.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::IndexOutOfBounds` for a missing token, or
    /// `CommandError::Parse` if the token is not an integer.
    pub fn get_integer(&self, index: usize) -> Result<i32, CommandError> {
        self.get_string(index)?;
        self.parse_integer(index).ok_or(CommandError::Parse {
            index,
            expected: ArgumentType::Integer,
        })
    }

    #[must_use]
    pub fn is_integer(&self, index: usize) -> bool {
        self.parse_integer(index).is_some()
    }

    fn parse_double(&self, index: usize) -> Option<f64> {
        self.raw(index)?.parse().ok()
    }

    /// Parses and returns a double at the specified index.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::IndexOutOfBounds` for a missing token, or
    /// `CommandError::Parse` if the token is not a number.
    pub fn get_double(&self, index: usize) -> Result<f64, CommandError> {
        self.get_string(index)?;
        self.parse_double(index).ok_or(CommandError::Parse {
            index,
            expected: ArgumentType::Double,
        })
    }

    #[must_use]
    pub fn is_double(&self, index: usize) -> bool {
        self.parse_double(index).is_some()
    }

    // Only the literals "true" and "false" count, in any case.
    fn parse_boolean(&self, index: usize) -> Option<bool> {
        let token = self.raw(index)?;
        if token.eq_ignore_ascii_case("true") {
            Some(true)
        } else if token.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    /// Parses and returns a boolean at the specified index.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::IndexOutOfBounds` for a missing token, or
    /// `CommandError::Parse` if the token is neither `true` nor `false`.
    pub fn get_boolean(&self, index: usize) -> Result<bool, CommandError> {
        self.get_string(index)?;
        self.parse_boolean(index).ok_or(CommandError::Parse {
            index,
            expected: ArgumentType::Boolean,
        })
    }

    #[must_use]
    pub fn is_boolean(&self, index: usize) -> bool {
        self.parse_boolean(index).is_some()
    }

    /// Returns every argument from `index` on, separated by single spaces.
    #[must_use]
    pub fn get_joined_string(&self, index: usize) -> String {
        self.args.get(index..).unwrap_or_default().join(" ")
    }

    /// Resolves the player named at `index` through the host server.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::IndexOutOfBounds` for a missing token, or
    /// `CommandError::Lookup` if no such player is online.
    pub fn get_player<S: Server>(
        &self,
        index: usize,
        exact: bool,
        server: &S,
    ) -> Result<S::Player, CommandError> {
        let name = self.get_string(index)?;
        server.player(name, exact).ok_or_else(|| CommandError::Lookup {
            kind: "Player",
            name: name.to_string(),
        })
    }

    #[must_use]
    pub fn is_player<S: Server>(&self, index: usize, exact: bool, server: &S) -> bool {
        self.raw(index)
            .is_some_and(|name| server.player(name, exact).is_some())
    }

    /// Resolves the world named at `index` through the host server.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::IndexOutOfBounds` for a missing token, or
    /// `CommandError::Lookup` if no such world exists.
    pub fn get_world<S: Server>(&self, index: usize, server: &S) -> Result<S::World, CommandError> {
        let name = self.get_string(index)?;
        server.world(name).ok_or_else(|| CommandError::Lookup {
            kind: "World",
            name: name.to_string(),
        })
    }

    #[must_use]
    pub fn is_world<S: Server>(&self, index: usize, server: &S) -> bool {
        self.raw(index).is_some_and(|name| server.world(name).is_some())
    }
}

impl From<Vec<String>> for Arguments {
    fn from(args: Vec<String>) -> Self {
        Self::new(args)
    }
}

impl From<&[&str]> for Arguments {
    fn from(args: &[&str]) -> Self {
        Self::new(args.iter().map(ToString::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Arguments {
    fn from(args: [&str; N]) -> Self {
        Self::from(&args[..])
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get_joined_string(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestServer;

    impl Server for TestServer {
        type Player = String;
        type World = String;

        fn player(&self, name: &str, exact: bool) -> Option<String> {
            let online = "Notch";
            let found = if exact {
                name == online
            } else {
                online.to_lowercase().starts_with(&name.to_lowercase())
            };
            found.then(|| online.to_string())
        }

        fn world(&self, name: &str) -> Option<String> {
            (name == "overworld").then(|| name.to_string())
        }
    }

    #[test]
    fn test_joined_string() {
        let args = Arguments::from(["a", "b", "c"]);
        assert_eq!(args.get_joined_string(0), "a b c");
        assert_eq!(args.get_joined_string(1), "b c");
        assert_eq!(args.get_joined_string(3), "");
        assert_eq!(args.get_joined_string(10), "");
        assert_eq!(Arguments::default().get_joined_string(0), "");
        assert_eq!(args.to_string(), "a b c");
    }

    #[test]
    fn test_integer_probe_never_fails() {
        let args = Arguments::from(["12", "twelve"]);
        assert!(args.is_integer(0));
        assert!(!args.is_integer(1));
        assert!(!args.is_integer(2));
    }

    #[test]
    fn test_integer_getter_distinguishes_failures() {
        let args = Arguments::from(["12", "twelve", "-7"]);
        assert_eq!(args.get_integer(0).unwrap(), 12);
        assert_eq!(args.get_integer(2).unwrap(), -7);
        match args.get_integer(1) {
            Err(CommandError::Parse { index, expected }) => {
                assert_eq!(index, 1);
                assert_eq!(expected, ArgumentType::Integer);
            }
            other => panic!("Expected Parse, got: {other:?}"),
        }
        match args.get_integer(5) {
            Err(CommandError::IndexOutOfBounds { index, size }) => {
                assert_eq!(index, 5);
                assert_eq!(size, 3);
            }
            other => panic!("Expected IndexOutOfBounds, got: {other:?}"),
        }
    }

    #[test]
    fn test_double() {
        let args = Arguments::from(["1.5", "3", "x"]);
        assert!((args.get_double(0).unwrap() - 1.5).abs() < f64::EPSILON);
        assert!((args.get_double(1).unwrap() - 3.0).abs() < f64::EPSILON);
        assert!(!args.is_double(2));
        assert!(!args.is_double(3));
        assert!(matches!(
            args.get_double(2),
            Err(CommandError::Parse {
                expected: ArgumentType::Double,
                ..
            })
        ));
    }

    #[test]
    fn test_boolean_accepts_only_literals() {
        let args = Arguments::from(["TRUE", "false", "yes", "1"]);
        assert!(args.get_boolean(0).unwrap());
        assert!(!args.get_boolean(1).unwrap());
        assert!(!args.is_boolean(2));
        assert!(!args.is_boolean(3));
        assert!(!args.is_boolean(4));
        assert!(matches!(
            args.get_boolean(4),
            Err(CommandError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_get_string_out_of_bounds() {
        let args = Arguments::from(["only"]);
        assert_eq!(args.get_string(0).unwrap(), "only");
        assert!(matches!(
            args.get_string(1),
            Err(CommandError::IndexOutOfBounds { index: 1, size: 1 })
        ));
    }

    #[test]
    fn test_player_and_world_lookup() {
        let args = Arguments::from(["notch", "Notch", "nether", "overworld"]);
        let server = TestServer;
        assert_eq!(args.get_player(0, false, &server).unwrap(), "Notch");
        assert!(!args.is_player(0, true, &server));
        assert!(args.is_player(1, true, &server));
        assert!(!args.is_player(9, false, &server));
        match args.get_world(2, &server) {
            Err(CommandError::Lookup { kind, name }) => {
                assert_eq!(kind, "World");
                assert_eq!(name, "nether");
            }
            other => panic!("Expected Lookup, got: {other:?}"),
        }
        assert!(args.is_world(3, &server));
    }

    #[test]
    fn test_tail_strips_first_token() {
        let args = Arguments::from(["set", "myhome"]);
        assert_eq!(args.tail().get(), ["myhome".to_string()]);
        assert!(Arguments::default().tail().is_empty());
    }
}
