use crate::error::RecordError;

const PREFIX: char = 'S';
const MAX_CODE: u32 = 9999;

/// Parse a customer code of the form `S` + four digits.
pub fn parse_customer_code(code: &str) -> Option<u32> {
  let digits = code.strip_prefix(PREFIX)?;
  if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  digits.parse().ok()
}

pub fn format_customer_code(n: u32) -> String {
  format!("{}{:04}", PREFIX, n)
}

/// The lowest free customer code, starting at `S0001`.
///
/// Codes that don't match the `S####` pattern are ignored, so a gap left by
/// a deleted customer is reused before the sequence grows.
pub fn next_customer_code<'a>(
  existing: impl IntoIterator<Item = &'a str>,
) -> Result<String, RecordError> {
  let mut taken: Vec<u32> = existing
    .into_iter()
    .filter_map(parse_customer_code)
    .collect();
  taken.sort_unstable();
  taken.dedup();

  let mut next = 1;
  for n in taken {
    if n < next {
      // S0000 is not part of the sequence.
      continue;
    }
    if n != next {
      break;
    }
    next += 1;
  }

  if next > MAX_CODE {
    return Err(RecordError::CodeSequenceExhausted);
  }
  Ok(format_customer_code(next))
}
