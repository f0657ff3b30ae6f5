//! Output role resolution.
//!
//! Detection models report their outputs under engine-specific names and in
//! engine-specific order. A [`RoleResolver`] decides which output holds the
//! boxes, the scores and (optionally) the class indices. Strategies are
//! selected at pipeline construction through [`RoleStrategy`], or supplied
//! directly as a custom resolver.

use crate::tensor::{OutputMap, TensorView};
use crate::util::{DetDecodeError, DetDecodeResult};

/// Output views assigned to their semantic roles.
#[derive(Copy, Clone, Debug)]
pub struct ResolvedRoles<'a> {
    /// Name and view of the boxes output (`[N, 4]` or `[1, N, 4]`).
    pub boxes: (&'a str, TensorView<'a>),
    /// Name and view of the scores output (`[N]` or `[1, N]`).
    pub scores: (&'a str, TensorView<'a>),
    /// Name and view of the class-index output; `None` for single-class models.
    pub classes: Option<(&'a str, TensorView<'a>)>,
}

/// Strategy for assigning roles to model outputs.
pub trait RoleResolver {
    /// Resolves roles, or returns [`DetDecodeError::UnresolvedOutputRoles`].
    fn resolve<'a>(&self, outputs: &'a OutputMap<'_>) -> DetDecodeResult<ResolvedRoles<'a>>;
}

fn unresolved<T>(reason: &'static str) -> DetDecodeResult<T> {
    Err(DetDecodeError::UnresolvedOutputRoles { reason })
}

fn has_box_width(view: &TensorView<'_>, rank: usize) -> bool {
    view.rank() == rank && view.last_dim() == Some(4)
}

/// `[N]`, `[1, N]` or `[N, 1]`.
fn is_per_candidate(view: &TensorView<'_>) -> bool {
    matches!(view.shape(), [_] | [1, _] | [_, 1])
}

/// Picks the boxes output.
///
/// A rank-3 `[1, N, 4]` output wins. Rank-2 `[N, 4]` outputs are considered
/// only when no rank-3 one exists; with four candidates a `[1, 4]` scores or
/// classes output has the same shape, so `[1, 4]` loses to any `[N, 4]` with
/// `N > 1`.
fn pick_boxes<'a>(outputs: &'a OutputMap<'_>) -> DetDecodeResult<(&'a str, TensorView<'a>)> {
    let rank3: Vec<_> = outputs.iter().filter(|(_, v)| has_box_width(v, 3)).collect();
    match rank3.as_slice() {
        [only] => return Ok(*only),
        [] => {}
        _ => return unresolved("more than one rank-3 output shaped like boxes"),
    }

    let rank2: Vec<_> = outputs.iter().filter(|(_, v)| has_box_width(v, 2)).collect();
    if let [only] = rank2.as_slice() {
        return Ok(*only);
    }
    let multi: Vec<_> = rank2.iter().filter(|(_, v)| v.shape()[0] != 1).collect();
    match multi.as_slice() {
        [only] => Ok(**only),
        [] if rank2.is_empty() => unresolved("no output shaped like boxes"),
        _ => unresolved("more than one output shaped like boxes"),
    }
}

/// Shape heuristic.
///
/// The boxes output is the single rank-3 output whose last dimension is 4,
/// falling back to a single rank-2 `[N, 4]` output. Among the remaining
/// per-candidate outputs (`[N]`, `[1, N]` or `[N, 1]`), the first in
/// encounter order is scores and the second is classes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ByShape;

impl RoleResolver for ByShape {
    fn resolve<'a>(&self, outputs: &'a OutputMap<'_>) -> DetDecodeResult<ResolvedRoles<'a>> {
        let boxes = pick_boxes(outputs)?;

        let mut per_candidate = outputs
            .iter()
            .filter(|(name, view)| *name != boxes.0 && is_per_candidate(view));
        let Some(scores) = per_candidate.next() else {
            return unresolved("no output shaped like scores");
        };
        let classes = per_candidate.next();

        Ok(ResolvedRoles {
            boxes,
            scores,
            classes,
        })
    }
}

/// Exact-name lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ByName {
    /// Name of the boxes output.
    pub boxes: String,
    /// Name of the scores output.
    pub scores: String,
    /// Name of the classes output; `None` for single-class models.
    pub classes: Option<String>,
}

impl ByName {
    /// Creates a name lookup for boxes, scores and an optional classes output.
    pub fn new(
        boxes: impl Into<String>,
        scores: impl Into<String>,
        classes: Option<impl Into<String>>,
    ) -> Self {
        Self {
            boxes: boxes.into(),
            scores: scores.into(),
            classes: classes.map(Into::into),
        }
    }

    /// Checks that configured names are non-empty.
    pub fn validate(&self) -> DetDecodeResult<()> {
        let empty = self.boxes.is_empty()
            || self.scores.is_empty()
            || self.classes.as_deref().is_some_and(str::is_empty);
        if empty {
            return Err(DetDecodeError::InvalidConfig {
                reason: "output names must be non-empty",
            });
        }
        Ok(())
    }
}

impl RoleResolver for ByName {
    fn resolve<'a>(&self, outputs: &'a OutputMap<'_>) -> DetDecodeResult<ResolvedRoles<'a>> {
        let find = |wanted: &str| outputs.iter().find(|(name, _)| *name == wanted);

        let Some(boxes) = find(self.boxes.as_str()) else {
            return unresolved("named boxes output missing");
        };
        let Some(scores) = find(self.scores.as_str()) else {
            return unresolved("named scores output missing");
        };
        let classes = match &self.classes {
            Some(wanted) => match find(wanted.as_str()) {
                Some(found) => Some(found),
                None => return unresolved("named classes output missing"),
            },
            None => None,
        };

        Ok(ResolvedRoles {
            boxes,
            scores,
            classes,
        })
    }
}

/// Encounter-order lookup: outputs 0, 1 and 2 are boxes, scores and classes.
///
/// With only two outputs the model is treated as single-class.
#[derive(Clone, Copy, Debug, Default)]
pub struct ByPosition;

impl RoleResolver for ByPosition {
    fn resolve<'a>(&self, outputs: &'a OutputMap<'_>) -> DetDecodeResult<ResolvedRoles<'a>> {
        let (Some(boxes), Some(scores)) = (outputs.get_index(0), outputs.get_index(1)) else {
            return unresolved("fewer than two outputs for positional lookup");
        };
        Ok(ResolvedRoles {
            boxes,
            scores,
            classes: outputs.get_index(2),
        })
    }
}

/// Name lookup first, shape heuristic when any named output is missing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameThenShape {
    /// Names tried before the shape heuristic.
    pub names: ByName,
}

impl RoleResolver for NameThenShape {
    fn resolve<'a>(&self, outputs: &'a OutputMap<'_>) -> DetDecodeResult<ResolvedRoles<'a>> {
        self.names
            .resolve(outputs)
            .or_else(|_| ByShape.resolve(outputs))
    }
}

/// Built-in resolver selection, chosen at pipeline construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RoleStrategy {
    /// Shape heuristic only.
    #[default]
    Shape,
    /// Exact names only.
    Name(ByName),
    /// Exact names, falling back to the shape heuristic.
    NameThenShape(ByName),
    /// Engine output order.
    Position,
}

impl RoleStrategy {
    /// Checks the configured names, if any.
    pub fn validate(&self) -> DetDecodeResult<()> {
        match self {
            RoleStrategy::Name(names) | RoleStrategy::NameThenShape(names) => names.validate(),
            RoleStrategy::Shape | RoleStrategy::Position => Ok(()),
        }
    }

    /// Builds the resolver for this strategy.
    pub fn build(&self) -> Box<dyn RoleResolver + Send + Sync> {
        match self {
            RoleStrategy::Shape => Box::new(ByShape),
            RoleStrategy::Name(names) => Box::new(names.clone()),
            RoleStrategy::NameThenShape(names) => Box::new(NameThenShape {
                names: names.clone(),
            }),
            RoleStrategy::Position => Box::new(ByPosition),
        }
    }
}
