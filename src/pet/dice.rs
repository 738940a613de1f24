/// Source of every random decision the pet makes.
///
/// Production uses `fastrand::Rng`; tests script outcomes so each branch of
/// the behavior machine can be forced.
pub trait Dice {
    /// True with probability `k / n`.
    fn chance(&mut self, k: u32, n: u32) -> bool;

    /// Uniform value in `lo..=hi`.
    fn between(&mut self, lo: u32, hi: u32) -> u32;

    /// Uniform index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;

    fn one_in(&mut self, n: u32) -> bool {
        self.chance(1, n)
    }
}

impl Dice for fastrand::Rng {
    fn chance(&mut self, k: u32, n: u32) -> bool {
        n > 0 && self.u32(0..n) < k
    }

    fn between(&mut self, lo: u32, hi: u32) -> u32 {
        self.u32(lo..=hi.max(lo))
    }

    fn pick(&mut self, len: usize) -> usize {
        self.usize(0..len.max(1))
    }
}


#[cfg(test)]
mod tests {
    use super::scripted::ScriptedDice;
    use super::*;

    #[test]
    fn rng_chance_bounds() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..200 {
            assert!(!rng.chance(0, 5));
            assert!(rng.chance(5, 5));
            let v = rng.between(5, 9);
            assert!((5..=9).contains(&v));
            assert!(rng.pick(3) < 3);
        }
    }

    #[test]
    fn scripted_dice_replays_then_defaults() {
        let mut dice = ScriptedDice::never()
            .with_chances(&[true])
            .with_values(&[7])
            .with_picks(&[2]);
        assert!(dice.one_in(6));
        assert!(!dice.one_in(6));
        assert_eq!(dice.between(5, 9), 7);
        assert_eq!(dice.between(5, 9), 5);
        assert_eq!(dice.pick(3), 2);
        assert_eq!(dice.pick(3), 0);
    }
}
