//! Word lists used by the difficulty heuristics.

/// Academic vocabulary across the common study subjects.
const DOMAIN_KEYWORDS: &[&str] = &[
    // mathematics
    "algebra", "antiderivative", "axiom", "calculus", "coefficient", "convergence",
    "derivative", "differentiation", "eigenvalue", "equation", "exponent", "function",
    "geometry", "integral", "integration", "lemma", "limit", "logarithm", "matrix",
    "polynomial", "probability", "proof", "statistics", "theorem", "topology", "vector",
    // physics and chemistry
    "acceleration", "atom", "catalyst", "electron", "energy", "entropy", "isotope",
    "molecule", "momentum", "quantum", "reaction", "thermodynamics", "velocity", "wavelength",
    // biology
    "cell", "chromosome", "ecosystem", "enzyme", "evolution", "genome", "metabolism",
    "mitochondria", "organism", "photosynthesis", "protein",
    // computing
    "algorithm", "compiler", "complexity", "database", "recursion", "syntax", "semantics",
    // humanities and social sciences
    "cognitive", "constitution", "democracy", "economy", "empirical", "hypothesis",
    "inflation", "methodology", "paradigm", "synthesis", "theory",
];

/// Frequent English words that never count as concepts.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "against", "because", "before", "being", "below", "between",
    "could", "doing", "during", "every", "first", "further", "having", "other", "their",
    "there", "these", "those", "through", "under", "until", "using", "where", "which",
    "while", "would", "without", "should", "another", "always", "within", "itself",
];

pub fn is_domain_keyword(word: &str) -> bool {
    DOMAIN_KEYWORDS.contains(&word)
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}
