use rand::distributions::Alphanumeric;
use rand::Rng;

pub(crate) const UID_LENGTH: usize = 8;

/// Generates the public uid of a collection or content unit.
pub(crate) fn generate_uid() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UID_LENGTH)
        .map(char::from)
        .collect()
}
