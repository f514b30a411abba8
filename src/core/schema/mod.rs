pub mod caster;
pub mod column;
pub mod guesser;
