use crate::proof::StepId;
use crate::term::Formula;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ScopeError {
	#[error("referred line `{reference}` does not exist")]
	UnknownReference {
		reference: StepId,
	},
	#[error("cannot refer to line `{reference}` from here, it is inside a closed sub-proof")]
	OutOfScopeReference {
		reference: StepId,
	},
	#[error("line `{step}` is defined twice")]
	DuplicateStep {
		step: StepId,
	},
	#[error("there is no open sub-proof to discharge")]
	NoOpenScope,
	#[error("line `{step}` is not the hypothesis of an open sub-proof")]
	NotAHypothesis {
		step: StepId,
	},
	#[error("sub-proof started at line `{hypothesis}` is not closed")]
	UnclosedScope {
		hypothesis: StepId,
	},
}

pub type ScopeId = usize;

const ROOT: ScopeId = 0;

#[derive(Clone, Debug)]
struct Frame {
	parent: Option<ScopeId>,
	/// Индекс гипотезы в `entries`, у корня её нет.
	hypothesis: Option<usize>,
}

/// Доказанная строка и подвывод, которому она принадлежит.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
	pub step: StepId,
	pub formula: Formula,
	pub scope: ScopeId,
}

/// Результат закрытия подвывода.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Discharged {
	pub hypothesis: Entry,
	/// Последняя строка подвывода. Если в нём ничего кроме гипотезы нет, то сама гипотеза.
	pub conclusion: Entry,
}

/// Контекст одного прохода проверки: доказанные строки и стек открытых подвыводов.
///
/// Подвыводы хранятся в арене и не удаляются после закрытия, строки только добавляются. Строка видна, если её подвывод открыт и лежит на пути от текущего подвывода к корню.
#[derive(Clone, Debug)]
pub struct Context {
	frames: Vec<Frame>,
	open: Vec<ScopeId>,
	entries: Vec<Entry>,
	index: BTreeMap<StepId, usize>,
}

impl Default for Context {
	fn default() -> Self {
		Context {
			frames: vec![Frame { parent: None, hypothesis: None }],
			open: vec![ROOT],
			entries: Vec::new(),
			index: BTreeMap::new(),
		}
	}
}

impl Context {
	pub fn new() -> Self {
		Self::default()
	}

	fn current(&self) -> ScopeId {
		self.open.last().copied().unwrap_or(ROOT)
	}

	/// Число открытых подвыводов.
	pub fn depth(&self) -> usize {
		self.open.len() - 1
	}

	fn is_visible(&self, scope: ScopeId) -> bool {
		let mut current = Some(self.current());
		while let Some(id) = current {
			if id == scope {
				return true;
			}
			current = self.frames[id].parent;
		}
		false
	}

	pub fn resolve(&self, reference: &StepId) -> Result<&Entry, ScopeError> {
		let entry = self.index
			.get(reference)
			.map(|&position| &self.entries[position])
			.ok_or_else(|| ScopeError::UnknownReference { reference: reference.clone() })?;

		if self.is_visible(entry.scope) {
			Ok(entry)
		} else {
			Err(ScopeError::OutOfScopeReference { reference: reference.clone() })
		}
	}

	fn add(&mut self, step: StepId, formula: Formula, scope: ScopeId) -> Result<usize, ScopeError> {
		use std::collections::btree_map::Entry::*;

		let position = self.entries.len();
		match self.index.entry(step.clone()) {
			Vacant(vacant) => {
				vacant.insert(position);
			},
			Occupied(_) => return Err(ScopeError::DuplicateStep { step }),
		}
		self.entries.push(Entry { step, formula, scope });
		Ok(position)
	}

	/// Добавляет доказанную строку в текущий подвывод.
	pub fn push(&mut self, step: StepId, formula: Formula) -> Result<(), ScopeError> {
		let scope = self.current();
		self.add(step, formula, scope).map(|_| ())
	}

	/// Открывает подвывод, первая строка которого гипотеза `formula`.
	pub fn open_hypothesis(&mut self, step: StepId, formula: Formula) -> Result<ScopeId, ScopeError> {
		if self.index.contains_key(&step) {
			return Err(ScopeError::DuplicateStep { step });
		}

		let scope = self.frames.len();
		self.frames.push(Frame { parent: Some(self.current()), hypothesis: None });
		let position = self.add(step, formula, scope)?;
		self.frames[scope].hypothesis = Some(position);
		self.open.push(scope);
		Ok(scope)
	}

	fn hypothesis_of(&self, scope: ScopeId) -> Option<&Entry> {
		self.frames[scope].hypothesis.map(|position| &self.entries[position])
	}

	/// Закрывает самый внутренний подвывод. Если указан `target`, то это должна быть гипотеза именно этого подвывода.
	pub fn discharge(&mut self, target: Option<&StepId>) -> Result<Discharged, ScopeError> {
		let innermost = self.current();
		let hypothesis = match self.hypothesis_of(innermost) {
			Some(hypothesis) => hypothesis.clone(),
			None => return Err(ScopeError::NoOpenScope),
		};

		if let Some(target) = target {
			let position = self.open
				.iter()
				.position(|&scope| self.hypothesis_of(scope).map_or(false, |entry| entry.step == *target));
			match position {
				None => return Err(ScopeError::NotAHypothesis { step: target.clone() }),
				Some(position) if position + 1 != self.open.len() => {
					return Err(ScopeError::UnclosedScope { hypothesis: hypothesis.step });
				},
				Some(_) => {},
			}
		}

		let conclusion = self.entries
			.iter()
			.rev()
			.find(|entry| entry.scope == innermost)
			.cloned()
			.unwrap_or_else(|| hypothesis.clone());
		self.open.pop();
		Ok(Discharged { hypothesis, conclusion })
	}

	/// Гипотезы открытых подвыводов, от внешней к внутренней.
	pub fn assumptions(&self) -> Vec<Formula> {
		self.open
			.iter()
			.filter_map(|&scope| self.hypothesis_of(scope))
			.map(|entry| entry.formula.clone())
			.collect()
	}

	/// Проверяет, что все подвыводы закрыты.
	pub fn finish(&self) -> Result<(), ScopeError> {
		match self.hypothesis_of(self.current()) {
			Some(hypothesis) => Err(ScopeError::UnclosedScope { hypothesis: hypothesis.step.clone() }),
			None => Ok(()),
		}
	}
}
