//! Capture group trees mirroring the underlying regex match structure.

/// One node of a capture group tree.
///
/// The outermost node is a parameter's own capture group; children are the
/// groups nested inside the parameter's regular expression, nested by span
/// containment. Groups that did not participate in the match have no start
/// and no value but keep their position in the tree so group order stays
/// aligned with the regular expression source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptureGroup {
    /// Byte offset of the group within the matched text, when it participated.
    pub start: Option<usize>,
    /// The matched text, when the group participated.
    pub value: Option<String>,
    /// Nested capture groups.
    pub children: Vec<CaptureGroup>,
}

impl CaptureGroup {
    /// Collect this group's value followed by all descendant values in group
    /// order, the shape expected by parameter-type transformers.
    #[must_use]
    pub fn flatten(&self) -> Vec<Option<&str>> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<Option<&'a str>>) {
        out.push(self.value.as_deref());
        for child in &self.children {
            child.collect_into(out);
        }
    }
}

/// A capture entry as extracted from the regex engine: the byte span (when
/// the group participated) and the matched text.
pub(crate) type CaptureEntry = (Option<(usize, usize)>, Option<String>);

/// Build a group tree from capture entries in group-index order.
///
/// The first entry is the root. Subsequent participating entries nest inside
/// the most recent group whose span contains them; non-participating entries
/// attach to the group currently being built so their position is retained.
pub(crate) fn build_group_tree(entries: &[CaptureEntry]) -> CaptureGroup {
    let mut cursor = 0;
    build_node(entries, &mut cursor, usize::MAX)
}

fn build_node(entries: &[CaptureEntry], cursor: &mut usize, parent_end: usize) -> CaptureGroup {
    let (span, value) = entries
        .get(*cursor)
        .cloned()
        .unwrap_or((None, None));
    *cursor += 1;

    let mut node = CaptureGroup {
        start: span.map(|(start, _)| start),
        value,
        children: Vec::new(),
    };
    let end = span.map_or(parent_end, |(_, span_end)| span_end);

    while let Some((next_span, _)) = entries.get(*cursor) {
        match (*next_span, span) {
            (Some((next_start, _)), Some((start, _))) => {
                if next_start >= start && next_start < end {
                    node.children.push(build_node(entries, cursor, end));
                } else {
                    break;
                }
            }
            (None, _) => {
                node.children.push(CaptureGroup::default());
                *cursor += 1;
            }
            (Some(_), None) => break,
        }
    }

    node
}
