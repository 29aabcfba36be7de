use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Error, Result};

/// One given name and one surname, each chosen uniformly, joined by a space.
pub fn generate_name<R, G, S>(rng: &mut R, given_names: &[G], surnames: &[S]) -> Result<String>
where
    R: Rng + ?Sized,
    G: AsRef<str>,
    S: AsRef<str>,
{
    let given = given_names.choose(&mut *rng).ok_or(Error::EmptySequence)?;
    let surname = surnames.choose(&mut *rng).ok_or(Error::EmptySequence)?;
    Ok(format!("{} {}", given.as_ref(), surname.as_ref()))
}

/// Lower-case form with spaces replaced by hyphens.
pub fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}
