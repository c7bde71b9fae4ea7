use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Client-side id for a module or lesson awaiting its first save.
pub fn generate_id() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("id_{}_{}", &token[..9], Utc::now().timestamp_millis())
}

pub fn generate_course_code(title: &str) -> String {
    generate_course_code_with(title, &mut rand::thread_rng())
}

/// Initials of the first three title words, then a 4 character base-36 suffix.
pub fn generate_course_code_with<R: Rng + ?Sized>(title: &str, rng: &mut R) -> String {
    let initials: String = title
        .split_whitespace()
        .take(3)
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect();
    let suffix: String = (0..4)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    let prefix = if initials.is_empty() { "CRS" } else { initials.as_str() };
    format!("{prefix}-{suffix}")
}
