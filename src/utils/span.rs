use annotate_snippets::{
	display_list::{DisplayList, FormatOptions},
	snippet::{Annotation, AnnotationType, Slice, Snippet, SourceAnnotation},
};
use itertools::Itertools;
use std::fmt::Display;
use std::ops::Range;

/// Байтовый диапазон во всём входном тексте.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct GlobalSpan(pub Range<usize>);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Spanned<T> {
	pub span: GlobalSpan,
	pub inner: T,
}

impl<T> Spanned<T> {
	pub fn new(t: T, span: GlobalSpan) -> Self {
		Spanned {
			span,
			inner: t,
		}
	}
}

impl<T: Display> Spanned<T> {
	pub fn print_error_snippet(&self, string: &str) {
		let text = self.inner.to_string();
		let (line_no, first_line) = find_line(string, self.span.0.start);
		let (_, last_line) = find_line(string, self.span.0.end);
		let source = &string[first_line.start..last_line.end];
		let range = (
			char_offset(source, self.span.0.start - first_line.start),
			char_offset(source, self.span.0.end - first_line.start),
		);

		let snippet = Snippet {
			title: Some(Annotation {
				label: Some(&text),
				id: None,
				annotation_type: AnnotationType::Error,
			}),
			footer: vec![],
			slices: vec![
				Slice {
					source,
					line_start: line_no,
					origin: None,
					fold: true,
					annotations: vec![
						SourceAnnotation {
							label: "",
							annotation_type: AnnotationType::Error,
							range,
						},
					],
				},
			],
			opt: FormatOptions {
				color: true,
				..Default::default()
			},
		};
		println!("{}", DisplayList::from(snippet));
	}
}

/// Число символов в первых `byte_pos` байтах строки.
fn char_offset(string: &str, byte_pos: usize) -> usize {
	string
		.char_indices()
		.take_while(|(index, _)| *index < byte_pos)
		.count()
}

/// Номер строки, начиная с единицы, и её байтовый диапазон без перевода строки.
fn find_line(string: &str, pos: usize) -> (usize, Range<usize>) {
	let mut start = 0;
	let mut line_no = 1;
	for line in string.split('\n') {
		let end = start + line.len();
		if pos <= end {
			return (line_no, start..end);
		}
		start = end + 1;
		line_no += 1;
	}
	(line_no, string.len()..string.len())
}

/// Преобразование ошибки `rust-peg` в формат `snippet`.
pub fn peg_error_to_snippet(err: peg::error::ParseError<peg::str::LineCol>, string: &str) {
	let inner_text = format!("expected tokens: {}", err.expected.tokens().join(", "));
	let (line_no, line) = find_line(string, err.location.offset);
	let source = &string[line.clone()];
	let position = char_offset(source, err.location.offset - line.start);

	let snippet = Snippet {
		title: Some(Annotation {
			label: Some("unexpected token"),
			id: None,
			annotation_type: AnnotationType::Error,
		}),
		footer: vec![Annotation {
			label: Some(&inner_text),
			id: None,
			annotation_type: AnnotationType::Note,
		}],
		slices: vec![
			Slice {
				source,
				line_start: line_no,
				origin: None,
				fold: true,
				annotations: vec![
					SourceAnnotation {
						label: "unexpected token",
						annotation_type: AnnotationType::Error,
						range: (position, position + 1),
					},
				],
			},
		],
		opt: FormatOptions {
			color: true,
			..Default::default()
		},
	};
	println!("{}", DisplayList::from(snippet));
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lines() {
		let text = "first\nsecond\nthird";
		assert_eq!(find_line(text, 0), (1, 0..5));
		assert_eq!(find_line(text, 8), (2, 6..12));
		assert_eq!(find_line(text, text.len()), (3, 13..18));
	}

	#[test]
	fn char_offsets() {
		assert_eq!(char_offset("∀x.P(x)", 0), 0);
		assert_eq!(char_offset("∀x.P(x)", "∀x".len()), 2);
	}
}
