// Random source for the reveal cascade
// Any rand::Rng works as-is; tests substitute a scripted sequence

use rand::Rng;

/// A source of uniform draws, consumed one roll at a time
pub trait Dice {
    /// Draw a value uniformly from `0..sides`
    fn roll(&mut self, sides: usize) -> usize;
}

impl<R: Rng> Dice for R {
    fn roll(&mut self, sides: usize) -> usize {
        self.gen_range(0..sides)
    }
}

/// Replays a fixed list of rolls, then keeps returning `fallback`
#[cfg(test)]
pub struct ScriptedDice {
    rolls: std::collections::VecDeque<usize>,
    fallback: usize,
    pub used: usize,
}

#[cfg(test)]
impl ScriptedDice {
    pub fn new(rolls: &[usize], fallback: usize) -> Self {
        ScriptedDice {
            rolls: rolls.iter().copied().collect(),
            fallback,
            used: 0,
        }
    }

    /// Every roll rejects the cascade
    pub fn never() -> Self {
        Self::new(&[], 9)
    }

    /// Every roll admits the cascade
    pub fn always() -> Self {
        Self::new(&[], 0)
    }
}

#[cfg(test)]
impl Dice for ScriptedDice {
    fn roll(&mut self, sides: usize) -> usize {
        self.used += 1;
        self.rolls.pop_front().unwrap_or(self.fallback) % sides
    }
}
