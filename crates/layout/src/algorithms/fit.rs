pub struct FitAnalysis {
    pub fits: bool,
    pub remaining_height: f32,
}

// Tolerates float noise from summing fractional line and row heights.
const EPSILON: f32 = 0.01;

/// Centralized logic to check if a block fits in the remaining space.
///
/// * `offset_y`: The current position relative to the top of the container.
/// * `needed`: The required height.
/// * `container_height`: The height of the container on the current page.
pub fn check_fit(offset_y: f32, needed: f32, container_height: f32) -> FitAnalysis {
    let remaining_height = (container_height - offset_y).max(0.0);
    FitAnalysis {
        fits: fits(needed, remaining_height),
        remaining_height,
    }
}

pub fn fits(needed: f32, available: f32) -> bool {
    needed <= available + EPSILON
}

/// Takes up to `available` from `space`. Returns the amount taken; a
/// remainder below the tolerance is consumed as well.
pub fn consume(space: &mut f32, available: f32) -> f32 {
    let taken = if fits(*space, available) { *space } else { available.max(0.0) };
    *space -= taken;
    if *space <= EPSILON {
        *space = 0.0;
    }
    taken
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_fit() {
        assert!(check_fit(0.0, 50.0, 50.0).fits);
        assert!(check_fit(30.0, 20.004, 50.0).fits);
        assert!(!check_fit(30.0, 21.0, 50.0).fits);
        assert_eq!(check_fit(60.0, 1.0, 50.0).remaining_height, 0.0);
    }

    #[test]
    fn test_consume_space() {
        let mut space = 30.0;
        assert_eq!(consume(&mut space, 20.0), 20.0);
        assert_eq!(space, 10.0);
        assert_eq!(consume(&mut space, 20.0), 10.0);
        assert_eq!(space, 0.0);
    }
}
