use crate::grid::CoreId;

/// Picks cores for a task that is about to start
pub trait Placer {
    /// Returns at most `required` cores taken from `available`. A shorter
    /// result means the grid cannot host the task right now.
    fn place(&mut self, required: usize, available: &[bool]) -> Vec<CoreId>;
}

/// First-fit in index order, no thermal or frequency awareness
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyPlacer;

impl Placer for GreedyPlacer {
    fn place(&mut self, required: usize, available: &[bool]) -> Vec<CoreId> {
        available
            .iter()
            .enumerate()
            .filter(|&(_, &free)| free)
            .map(|(core, _)| core)
            .take(required)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fit() {
        let available = [false, true, true, false, true, true];
        assert_eq!(GreedyPlacer.place(3, &available), vec![1, 2, 4]);
    }

    #[test]
    fn test_short_placement() {
        let available = [false, true, false, true];
        assert_eq!(GreedyPlacer.place(4, &available), vec![1, 3]);
        assert!(GreedyPlacer.place(2, &[false; 4]).is_empty());
    }

    #[test]
    fn test_zero_required() {
        assert!(GreedyPlacer.place(0, &[true; 4]).is_empty());
    }
}
