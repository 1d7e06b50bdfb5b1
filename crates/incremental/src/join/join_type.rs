//! Join semantics.

/// Which side of a join a source row or column belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinSide {
    Left,
    Right,
}

impl JoinSide {
    /// Returns the opposite side.
    #[inline]
    pub fn other(self) -> Self {
        match self {
            JoinSide::Left => JoinSide::Right,
            JoinSide::Right => JoinSide::Left,
        }
    }
}

/// Join type determines which unmatched rows are surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinType {
    /// Only pairs with both sides set.
    Inner,
    /// Every left row, paired or not.
    LeftOuter,
    /// Every right row, paired or not.
    RightOuter,
    /// Every row from either side.
    FullOuter,
}

impl JoinType {
    /// Returns true if a pairing with the given sides set is part of the
    /// join result.
    #[inline]
    pub fn is_visible(self, has_left: bool, has_right: bool) -> bool {
        match self {
            JoinType::Inner => has_left && has_right,
            JoinType::LeftOuter => has_left,
            JoinType::RightOuter => has_right,
            JoinType::FullOuter => has_left || has_right,
        }
    }

    pub const ALL: [JoinType; 4] = [
        JoinType::Inner,
        JoinType::LeftOuter,
        JoinType::RightOuter,
        JoinType::FullOuter,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_table() {
        for join_type in JoinType::ALL {
            assert!(join_type.is_visible(true, true));
            assert!(!join_type.is_visible(false, false));
        }
        assert!(!JoinType::Inner.is_visible(true, false));
        assert!(JoinType::LeftOuter.is_visible(true, false));
        assert!(!JoinType::LeftOuter.is_visible(false, true));
        assert!(JoinType::RightOuter.is_visible(false, true));
        assert!(JoinType::FullOuter.is_visible(true, false));
        assert!(JoinType::FullOuter.is_visible(false, true));
    }

    #[test]
    fn test_side_other() {
        assert_eq!(JoinSide::Left.other(), JoinSide::Right);
        assert_eq!(JoinSide::Right.other(), JoinSide::Left);
    }
}
