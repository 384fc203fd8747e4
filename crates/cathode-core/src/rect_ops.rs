use cathode_common::Rect;

/// The decomposition of a scroll into a block move plus an erase of the
/// revealed area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScrollPlan {
    /// `(dest, src)` of the surviving content, if any survives.
    pub moverect: Option<(Rect, Rect)>,
    /// The area left behind, to be erased.
    pub erase: Rect,
}

/// Decompose a scroll of `rect` by (downward, rightward). A scroll larger
/// than the rect in either axis degenerates to erasing the whole rect.
pub(crate) fn plan_scroll(mut rect: Rect, downward: i32, rightward: i32) -> ScrollPlan {
    if downward.abs() >= rect.height() || rightward.abs() >= rect.width() {
        return ScrollPlan {
            moverect: None,
            erase: rect,
        };
    }

    let mut src = Rect::default();
    let mut dest = Rect::default();

    if rightward >= 0 {
        dest.start_col = rect.start_col;
        dest.end_col = rect.end_col - rightward;
        src.start_col = rect.start_col + rightward;
        src.end_col = rect.end_col;
    } else {
        let leftward = -rightward;
        dest.start_col = rect.start_col + leftward;
        dest.end_col = rect.end_col;
        src.start_col = rect.start_col;
        src.end_col = rect.end_col - leftward;
    }

    if downward >= 0 {
        dest.start_row = rect.start_row;
        dest.end_row = rect.end_row - downward;
        src.start_row = rect.start_row + downward;
        src.end_row = rect.end_row;
    } else {
        let upward = -downward;
        dest.start_row = rect.start_row + upward;
        dest.end_row = rect.end_row;
        src.start_row = rect.start_row;
        src.end_row = rect.end_row - upward;
    }

    if downward > 0 {
        rect.start_row = rect.end_row - downward;
    } else if downward < 0 {
        rect.end_row = rect.start_row - downward;
    }

    if rightward > 0 {
        rect.start_col = rect.end_col - rightward;
    } else if rightward < 0 {
        rect.end_col = rect.start_col - rightward;
    }

    ScrollPlan {
        moverect: Some((dest, src)),
        erase: rect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_up_one() {
        let plan = plan_scroll(Rect::new(0, 24, 0, 80), 1, 0);
        assert_eq!(
            plan.moverect,
            Some((Rect::new(0, 23, 0, 80), Rect::new(1, 24, 0, 80)))
        );
        assert_eq!(plan.erase, Rect::new(23, 24, 0, 80));
    }

    #[test]
    fn test_scroll_down_two() {
        let plan = plan_scroll(Rect::new(0, 10, 0, 80), -2, 0);
        assert_eq!(
            plan.moverect,
            Some((Rect::new(2, 10, 0, 80), Rect::new(0, 8, 0, 80)))
        );
        assert_eq!(plan.erase, Rect::new(0, 2, 0, 80));
    }

    #[test]
    fn test_oversized_scroll_erases_all() {
        let rect = Rect::new(0, 4, 0, 10);
        let plan = plan_scroll(rect, 5, 0);
        assert_eq!(plan.moverect, None);
        assert_eq!(plan.erase, rect);
    }

    #[test]
    fn test_horizontal_scroll() {
        let plan = plan_scroll(Rect::new(3, 4, 0, 80), 0, 1);
        assert_eq!(
            plan.moverect,
            Some((Rect::new(3, 4, 0, 79), Rect::new(3, 4, 1, 80)))
        );
        assert_eq!(plan.erase, Rect::new(3, 4, 79, 80));
    }
}
