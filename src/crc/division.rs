//! Exact binary long division over GF(2).
//!
//! The textbook construction: pad the message with `width − 1` zero bits,
//! divide by the generator with XOR-subtraction, and the trailing
//! `width − 1` bits are the remainder. Appending that remainder to the
//! message yields a codeword that re-divides to an all-zero remainder,
//! which is what [`verify`] checks.
//!
//! This engine accepts generators of any width (the leading coefficient
//! must be 1) and works on bit strings rather than bytes; it backs the
//! standalone verifier and the long-division trace, not the wire format.

use crate::crc::bits;
use crate::error::{LinkError, Result};
use crate::crc::GeneratorPoly;

fn sanitize(label: &str, s: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ' ' => continue,
            '0' => out.push(0),
            '1' => out.push(1),
            _ => {
                return Err(LinkError::config(format!(
                    "{} contains {:?}, expected only 0/1",
                    label, c
                )))
            }
        }
    }
    if out.is_empty() {
        return Err(LinkError::config(format!("{} is empty", label)));
    }
    Ok(out)
}

fn division_poly(poly: &GeneratorPoly) -> Result<Vec<u8>> {
    if !poly.has_leading_one() {
        return Err(LinkError::config(
            "long division needs a generator with its leading bit set",
        ));
    }
    sanitize("generator", poly.as_bits())
}

fn to_bit_str(bits: &[u8]) -> String {
    bits.iter().map(|b| if *b == 1 { '1' } else { '0' }).collect()
}

/// Compute the `width − 1` bit remainder of `msg_bits` divided by `poly`.
///
/// The message is padded with `width − 1` zeros before dividing, so the
/// append-and-reverify round trip holds.
pub fn remainder(msg_bits: &str, poly: &GeneratorPoly) -> Result<String> {
    let msg = sanitize("message", msg_bits)?;
    let gen = division_poly(poly)?;
    let n = gen.len();

    let mut work = msg.clone();
    work.extend(std::iter::repeat(0).take(n - 1));
    for i in 0..msg.len() {
        if work[i] == 1 {
            for j in 0..n {
                work[i + j] ^= gen[j];
            }
        }
    }
    Ok(to_bit_str(&work[work.len() - (n - 1)..]))
}

/// Build the codeword: message bits followed by their remainder.
pub fn codeword(msg_bits: &str, poly: &GeneratorPoly) -> Result<String> {
    let msg = sanitize("message", msg_bits)?;
    Ok(to_bit_str(&msg) + &remainder(msg_bits, poly)?)
}

/// Re-divide a codeword and report `(remainder, ok)`.
///
/// `ok` is true iff the remainder is all zero, i.e. the codeword is a
/// valid message-plus-remainder pair for this generator. A single flipped
/// bit anywhere in the codeword leaves a non-zero remainder.
pub fn verify(codeword_bits: &str, poly: &GeneratorPoly) -> Result<(String, bool)> {
    let mut work = sanitize("codeword", codeword_bits)?;
    let gen = division_poly(poly)?;
    let n = gen.len();
    if work.len() < n {
        return Err(LinkError::config(format!(
            "codeword of {} bits is shorter than the {}-bit generator",
            work.len(),
            n
        )));
    }

    for i in 0..=(work.len() - n) {
        if work[i] == 1 {
            for j in 0..n {
                work[i + j] ^= gen[j];
            }
        }
    }
    let rem = to_bit_str(&work[work.len() - (n - 1)..]);
    let ok = rem.chars().all(|c| c == '0');
    Ok((rem, ok))
}

/// One XOR-subtraction in the long division.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivisionStep {
    /// Bit position in the padded dividend where the subtraction starts.
    pub pos: usize,
    /// The aligned window before subtraction.
    pub segment: String,
    /// The generator being subtracted.
    pub generator: String,
    /// The window after subtraction.
    pub xor_result: String,
}

/// A captured long-division run: the padded dividend, every subtraction
/// step in order, and the final remainder.
///
/// Steps are stored, so the sequence is finite and can be iterated any
/// number of times. Purely presentational; nothing in the protocol path
/// depends on it.
#[derive(Debug, Clone)]
pub struct DivisionTrace {
    generator: String,
    dividend: String,
    steps: Vec<DivisionStep>,
    remainder: String,
}

impl DivisionTrace {
    /// Run the division for `msg_bits` (padded with `width − 1` zeros) and
    /// record each subtraction.
    pub fn capture(msg_bits: &str, poly: &GeneratorPoly) -> Result<Self> {
        let msg = sanitize("message", msg_bits)?;
        let gen = division_poly(poly)?;
        let n = gen.len();

        let mut work = msg.clone();
        work.extend(std::iter::repeat(0).take(n - 1));
        let dividend = to_bit_str(&work);

        let mut steps = Vec::new();
        for i in 0..msg.len() {
            if work[i] == 1 {
                let segment = to_bit_str(&work[i..i + n]);
                for j in 0..n {
                    work[i + j] ^= gen[j];
                }
                steps.push(DivisionStep {
                    pos: i,
                    segment,
                    generator: to_bit_str(&gen),
                    xor_result: to_bit_str(&work[i..i + n]),
                });
            }
        }

        Ok(Self {
            generator: to_bit_str(&gen),
            dividend,
            remainder: to_bit_str(&work[work.len() - (n - 1)..]),
            steps,
        })
    }

    /// The subtraction steps, in division order.
    pub fn steps(&self) -> std::slice::Iter<'_, DivisionStep> {
        self.steps.iter()
    }

    /// The padded dividend the division ran over.
    pub fn dividend(&self) -> &str {
        &self.dividend
    }

    /// The final remainder bits.
    pub fn remainder(&self) -> &str {
        &self.remainder
    }

    /// Render the division the way it is written out by hand, one aligned
    /// subtraction per step.
    pub fn render(&self) -> String {
        let n = self.generator.len();
        let mut lines = Vec::new();
        lines.push(format!("generator: {}", self.generator));
        lines.push(format!("dividend:  {}\n", self.dividend));
        for step in &self.steps {
            let indent = " ".repeat(step.pos);
            lines.push(format!("{}{}", indent, step.segment));
            lines.push(format!("{}{}", indent, self.generator));
            lines.push(format!("{}{}", indent, "-".repeat(n)));
            lines.push(format!("{}{}\n", indent, step.xor_result));
        }
        lines.push(format!("remainder: {}", self.remainder));
        lines.join("\n")
    }
}

/// Render the long-division trace for raw bytes, e.g. a frame's
/// header-plus-payload, against a generator polynomial.
pub fn explain(data: &[u8], poly: &GeneratorPoly) -> Result<String> {
    let trace = DivisionTrace::capture(&bits::bit_string(data), poly)?;
    Ok(trace.render())
}
