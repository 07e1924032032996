//! Span patches over markup text
//!
//! A patch replaces one byte range of the text. Patches are applied back to
//! front so earlier offsets stay valid while later ones are rewritten.

use tracing::{trace, warn};

use super::types::Span;

/// Replace `span` with `replacement`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPatch {
    pub span: Span,
    pub replacement: String,
}

impl TextPatch {
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(Span::at(offset), text)
    }

    pub fn delete(span: Span) -> Self {
        Self::replace(span, String::new())
    }
}

/// Apply patches to `text`
///
/// Patches that overlap an already accepted patch, or fall outside the text,
/// are skipped. Insertions at the same offset keep their given order.
pub fn apply_patches(text: &str, patches: Vec<TextPatch>) -> String {
    let mut ordered: Vec<(usize, TextPatch)> = patches.into_iter().enumerate().collect();
    ordered.sort_by(|(ia, a), (ib, b)| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(a.span.end.cmp(&b.span.end))
            .then(ia.cmp(ib))
    });

    let mut accepted: Vec<TextPatch> = Vec::with_capacity(ordered.len());
    for (_, patch) in ordered {
        let in_bounds = patch.span.start <= patch.span.end
            && patch.span.end <= text.len()
            && text.is_char_boundary(patch.span.start)
            && text.is_char_boundary(patch.span.end);
        if !in_bounds {
            warn!(start = patch.span.start, end = patch.span.end, "Skipping out-of-range patch");
            continue;
        }
        if let Some(last) = accepted.last() {
            if last.span.overlaps(&patch.span) || patch.span.start < last.span.end {
                warn!(
                    start = patch.span.start,
                    end = patch.span.end,
                    "Skipping overlapping patch"
                );
                continue;
            }
        }
        accepted.push(patch);
    }

    let mut result = text.to_string();
    for patch in accepted.iter().rev() {
        trace!(
            start = patch.span.start,
            end = patch.span.end,
            replacement = %patch.replacement,
            "Applying patch"
        );
        result.replace_range(patch.span.start..patch.span.end, &patch.replacement);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_insert() {
        let text = "<a x=\"1\"/>";
        let patched = apply_patches(
            text,
            vec![
                TextPatch::replace(Span::new(6, 7), "42"),
                TextPatch::insert(8, " y=\"3\""),
            ],
        );
        assert_eq!(patched, "<a x=\"42\" y=\"3\"/>");
    }

    #[test]
    fn test_insertions_at_same_offset_keep_order() {
        let patched = apply_patches(
            "ac",
            vec![TextPatch::insert(1, "b"), TextPatch::insert(1, "B")],
        );
        assert_eq!(patched, "abBc");
    }

    #[test]
    fn test_overlapping_patch_is_skipped() {
        let patched = apply_patches(
            "abcdef",
            vec![
                TextPatch::replace(Span::new(1, 4), "X"),
                TextPatch::replace(Span::new(2, 5), "Y"),
            ],
        );
        assert_eq!(patched, "aXef");
    }

    #[test]
    fn test_out_of_range_patch_is_skipped() {
        let patched = apply_patches("abc", vec![TextPatch::delete(Span::new(2, 10))]);
        assert_eq!(patched, "abc");
    }
}
