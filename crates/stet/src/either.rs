//! "Either A or B" fields.
//!
//! Some document positions accept two different shapes (a reference or an
//! inline object, a boolean or a schema). [`Either`] is the high-side sum;
//! [`EitherRepr`] is the core-side mirror, remembering which side the source
//! set and the source node's tag so the same shape is re-emitted.

use crate::{
    core::CoreValue,
    error::Error,
    model::HighValue,
    node::NodeId,
    sync::SyncContext,
    unmarshal::UnmarshalContext,
};

/// Exactly one of two alternatives.
#[derive(Debug, Clone, PartialEq)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Either<L, R> {
    pub fn is_left(&self) -> bool {
        matches!(self, Self::Left(_))
    }

    pub fn is_right(&self) -> bool {
        matches!(self, Self::Right(_))
    }

    pub fn as_left(&self) -> Option<&L> {
        match self {
            Self::Left(value) => Some(value),
            Self::Right(_) => None,
        }
    }

    pub fn as_right(&self) -> Option<&R> {
        match self {
            Self::Left(_) => None,
            Self::Right(value) => Some(value),
        }
    }
}

/// Core representation of an [`Either`] field.
#[derive(Debug, Clone, Default)]
pub struct EitherRepr<L, R> {
    pub left: Option<L>,
    pub right: Option<R>,
    /// Tag of the source node, kept for shape disambiguation on output.
    pub tag: Option<String>,
}

impl<L: CoreValue, R: CoreValue> CoreValue for EitherRepr<L, R> {
    const NULLABLE: bool = L::NULLABLE || R::NULLABLE;

    fn unmarshal(cx: &mut UnmarshalContext<'_>, node: NodeId) -> Result<Self, Error> {
        let node_tag = cx.arena()[cx.resolved(node)]
            .scalar_tag()
            .map(str::to_owned);

        // Try the left side first; a side that decodes without findings
        // wins. If both object, the left side's findings are reported.
        let (left, left_errors) = cx.speculate(|cx| L::unmarshal(cx, node))?;
        if left_errors.is_empty() {
            return Ok(Self {
                left: Some(left),
                right: None,
                tag: node_tag,
            });
        }
        let (right, right_errors) = cx.speculate(|cx| R::unmarshal(cx, node))?;
        if right_errors.is_empty() {
            return Ok(Self {
                left: None,
                right: Some(right),
                tag: node_tag,
            });
        }
        cx.absorb(left_errors);
        Ok(Self {
            left: Some(left),
            right: None,
            tag: node_tag,
        })
    }
}

impl<L: HighValue, R: HighValue> HighValue for Either<L, R> {
    type Repr = EitherRepr<L::Repr, R::Repr>;

    fn from_repr(repr: &Self::Repr) -> Result<Self, Error> {
        if let Some(left) = &repr.left {
            Ok(Self::Left(L::from_repr(left)?))
        } else if let Some(right) = &repr.right {
            Ok(Self::Right(R::from_repr(right)?))
        } else {
            Ok(Self::Left(L::from_repr(&L::Repr::default())?))
        }
    }

    fn eq_repr(&self, repr: &Self::Repr) -> bool {
        match self {
            Self::Left(value) => repr.left.as_ref().is_some_and(|l| value.eq_repr(l)),
            Self::Right(value) => repr.right.as_ref().is_some_and(|r| value.eq_repr(r)),
        }
    }

    fn identity(&self) -> Option<NodeId> {
        match self {
            Self::Left(value) => value.identity(),
            Self::Right(value) => value.identity(),
        }
    }

    fn sync_repr(
        &mut self,
        cx: &mut SyncContext<'_>,
        repr: &mut Self::Repr,
        node: Option<NodeId>,
    ) -> Result<NodeId, Error> {
        match self {
            Self::Left(value) => {
                repr.right = None;
                if repr.left.is_none() {
                    repr.left = Some(L::Repr::default());
                }
                value.sync_repr(cx, repr.left.as_mut().expect("just ensured"), node)
            }
            Self::Right(value) => {
                repr.left = None;
                if repr.right.is_none() {
                    repr.right = Some(R::Repr::default());
                }
                value.sync_repr(cx, repr.right.as_mut().expect("just ensured"), node)
            }
        }
    }
}
