use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Name of the pseudo-variable that yields a fresh random integer per read.
pub const RANDOM_VARIABLE: &str = "rand";

/// Supplies values for the `rand` pseudo-variable.
pub trait RandomSource {
    fn next_int(&mut self) -> i64;
}

/// Draws from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_int(&mut self) -> i64 {
        draw(&mut rand::thread_rng())
    }
}

/// Reproducible source for tests and replays.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_int(&mut self) -> i64 {
        draw(&mut self.rng)
    }
}

impl<F: FnMut() -> i64> RandomSource for F {
    fn next_int(&mut self) -> i64 {
        self()
    }
}

fn draw(rng: &mut impl Rng) -> i64 {
    i64::from(rng.gen_range(i32::MIN..=i32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_repeat() {
        let mut first = SeededRandom::new(7);
        let mut second = SeededRandom::new(7);
        let a = (0..16).map(|_| first.next_int()).collect::<Vec<_>>();
        let b = (0..16).map(|_| second.next_int()).collect::<Vec<_>>();
        assert_eq!(a, b);
        assert!(
            a.iter()
                .all(|value| (i64::from(i32::MIN)..=i64::from(i32::MAX)).contains(value))
        );
    }

    #[test]
    fn closures_are_sources() {
        let mut counter = 0_i64;
        let mut source = || {
            counter += 1;
            counter
        };
        assert_eq!(source.next_int(), 1);
        assert_eq!(source.next_int(), 2);
    }
}
