use crate::term::Formula;
use std::collections::BTreeSet;
use std::fmt;

/// Номер строки доказательства: `1`, `1.2`, `1.2.1`.
#[derive(Default, Ord, PartialOrd, Debug, Clone, Eq, PartialEq, Hash)]
pub struct StepId(pub Vec<u32>);

impl StepId {
	pub fn new(components: Vec<u32>) -> Self {
		StepId(components)
	}

	/// Следующая строка на том же уровне: `1.2` -> `1.3`.
	pub fn next(&self) -> StepId {
		let mut components = self.0.clone();
		match components.last_mut() {
			Some(last) => *last += 1,
			None => components.push(1),
		}
		StepId(components)
	}

	/// Первая строка вложенного уровня: `1.2` -> `1.2.1`.
	pub fn nested(&self) -> StepId {
		let mut components = self.0.clone();
		components.push(1);
		StepId(components)
	}

	/// Строка уровнем выше: `1.2.3` -> `1.2`.
	pub fn parent(&self) -> Option<StepId> {
		if self.0.len() > 1 {
			Some(StepId(self.0[..self.0.len() - 1].to_vec()))
		} else {
			None
		}
	}
}

impl From<u32> for StepId {
	fn from(number: u32) -> Self {
		StepId(vec![number])
	}
}

impl From<&[u32]> for StepId {
	fn from(components: &[u32]) -> Self {
		StepId(components.to_vec())
	}
}

impl fmt::Display for StepId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (index, component) in self.0.iter().enumerate() {
			if index != 0 {
				write!(f, ".")?;
			}
			write!(f, "{}", component)?;
		}
		Ok(())
	}
}

/// Шаг доказательства в том виде, в каком его отдаёт парсер.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProofStep {
	pub id: StepId,
	pub label: Option<String>,
	pub formula: Formula,
	pub rule: String,
	pub references: Vec<StepId>,
}

impl ProofStep {
	pub fn new(id: impl Into<StepId>, formula: Formula, rule: impl Into<String>, references: Vec<StepId>) -> Self {
		ProofStep {
			id: id.into(),
			label: None,
			formula,
			rule: rule.into(),
			references,
		}
	}
}

/// То, что объявлено до доказательства.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct Declarations {
	/// Объявленные высказывания и предикаты. `None` значит, что объявления не проверяются.
	pub symbols: Option<BTreeSet<String>>,
	/// Посылки, на которые можно сослаться правилом `Given`.
	pub givens: Vec<Formula>,
}

impl Declarations {
	pub fn declare(&mut self, symbol: impl Into<String>) {
		self.symbols.get_or_insert_with(BTreeSet::new).insert(symbol.into());
	}

	pub fn give(&mut self, formula: Formula) {
		self.givens.push(formula);
	}

	/// Первый необъявленный символ формулы.
	pub fn undeclared(&self, formula: &Formula) -> Option<String> {
		let symbols = self.symbols.as_ref()?;
		formula.predicates().into_iter().find(|name| !symbols.contains(name))
	}
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Numbering {
	/// Номера строк только уникальны.
	Free,
	/// Гипотеза открывает уровень `n.1`, выписка возвращает на уровень выше, остальные строки увеличивают последний компонент.
	Nested,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Options {
	pub numbering: Numbering,
	/// Сопоставлять ссылки с посылками правила в любом порядке.
	pub any_order: bool,
}

impl Default for Options {
	fn default() -> Self {
		Options {
			numbering: Numbering::Free,
			any_order: true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn step_ids() {
		let id = StepId::new(vec![1, 2]);
		assert_eq!(id.to_string(), "1.2");
		assert_eq!(id.next().to_string(), "1.3");
		assert_eq!(id.nested().to_string(), "1.2.1");
		assert_eq!(id.parent(), Some(StepId::from(1)));
		assert_eq!(StepId::from(1).parent(), None);
		assert!(StepId::from(2) > StepId::new(vec![1, 5]));
	}

	#[test]
	fn declarations() {
		let mut declarations = Declarations::default();
		let formula = Formula::and(Formula::atom("p"), Formula::atom("q"));
		assert_eq!(declarations.undeclared(&formula), None);

		declarations.declare("p");
		assert_eq!(declarations.undeclared(&formula), Some("q".to_string()));
		declarations.declare("q");
		assert_eq!(declarations.undeclared(&formula), None);
	}
}
