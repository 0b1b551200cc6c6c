//! Conversion table between LaTeX, combining Unicode, precomposed Unicode
//! and plain text spellings of accented letters, Greek letters and a few
//! typographic symbols.
//!
//! The table is an ordered slice and every conversion is a sequence of
//! unconditional substring replacements applied in table order. Entries are
//! arranged so that no later entry matches text produced by an earlier one.

/// One row of the conversion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// LaTeX form used in stored BibTeX values
    pub latex: &'static str,
    /// Base letter followed by a combining modifier (directory names)
    pub combining: &'static str,
    /// Precomposed Unicode codepoint
    pub unicode: &'static str,
    /// ASCII approximation used for citekeys
    pub plain: &'static str,
}

/// Selects one column of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Latex,
    Combining,
    Unicode,
    Plain,
}

impl Symbol {
    pub const fn new(
        latex: &'static str,
        combining: &'static str,
        unicode: &'static str,
        plain: &'static str,
    ) -> Self {
        Symbol {
            latex,
            combining,
            unicode,
            plain,
        }
    }

    pub fn get(&self, column: Column) -> &'static str {
        match column {
            Column::Latex => self.latex,
            Column::Combining => self.combining,
            Column::Unicode => self.unicode,
            Column::Plain => self.plain,
        }
    }
}

const fn s(
    latex: &'static str,
    combining: &'static str,
    unicode: &'static str,
    plain: &'static str,
) -> Symbol {
    Symbol::new(latex, combining, unicode, plain)
}

static LETTERS: &[Symbol] = &[
    // uppercase vowels with diaeresis
    s(r#"{\"A}"#, "A\u{0308}", "\u{00C4}", "A"),
    s(r#"{\"E}"#, "E\u{0308}", "\u{00CB}", "E"),
    s(r#"{\"I}"#, "I\u{0308}", "\u{00CF}", "I"),
    s(r#"{\"O}"#, "O\u{0308}", "\u{00D6}", "O"),
    s(r#"{\"U}"#, "U\u{0308}", "\u{00DC}", "U"),
    s(r#"{\"Y}"#, "Y\u{0308}", "\u{0178}", "Y"),
    // lowercase vowels with diaeresis
    s(r#"{\"a}"#, "a\u{0308}", "\u{00E4}", "a"),
    s(r#"{\"e}"#, "e\u{0308}", "\u{00EB}", "e"),
    s(r#"{\"i}"#, "i\u{0308}", "\u{00EF}", "i"),
    s(r#"{\"o}"#, "o\u{0308}", "\u{00F6}", "o"),
    s(r#"{\"u}"#, "u\u{0308}", "\u{00FC}", "u"),
    s(r#"{\"y}"#, "y\u{0308}", "\u{00FF}", "y"),
    // uppercase with acute
    s(r"{\'A}", "A\u{0301}", "\u{00C1}", "A"),
    s(r"{\'E}", "E\u{0301}", "\u{00C9}", "E"),
    s(r"{\'I}", "I\u{0301}", "\u{00CD}", "I"),
    s(r"{\'O}", "O\u{0301}", "\u{00D3}", "O"),
    s(r"{\'U}", "U\u{0301}", "\u{00DA}", "U"),
    s(r"{\'Y}", "Y\u{0301}", "\u{00DD}", "Y"),
    s(r"{\'C}", "C\u{0301}", "\u{0106}", "C"),
    s(r"{\'N}", "N\u{0301}", "\u{0143}", "N"),
    s(r"{\'S}", "S\u{0301}", "\u{015A}", "S"),
    // lowercase with acute
    s(r"{\'a}", "a\u{0301}", "\u{00E1}", "a"),
    s(r"{\'e}", "e\u{0301}", "\u{00E9}", "e"),
    s(r"{\'i}", "i\u{0301}", "\u{00ED}", "i"),
    s(r"{\'o}", "o\u{0301}", "\u{00F3}", "o"),
    s(r"{\'u}", "u\u{0301}", "\u{00FA}", "u"),
    s(r"{\'y}", "y\u{0301}", "\u{00FD}", "y"),
    s(r"{\'c}", "c\u{0301}", "\u{0107}", "c"),
    s(r"{\'n}", "n\u{0301}", "\u{0144}", "n"),
    s(r"{\'s}", "s\u{0301}", "\u{015B}", "s"),
    // uppercase vowels with grave
    s(r"{\`A}", "A\u{0300}", "\u{00C0}", "A"),
    s(r"{\`E}", "E\u{0300}", "\u{00C8}", "E"),
    s(r"{\`I}", "I\u{0300}", "\u{00CC}", "I"),
    s(r"{\`O}", "O\u{0300}", "\u{00D2}", "O"),
    s(r"{\`U}", "U\u{0300}", "\u{00D9}", "U"),
    s(r"{\`Y}", "Y\u{0300}", "\u{1EF2}", "Y"),
    // lowercase vowels with grave
    s(r"{\`a}", "a\u{0300}", "\u{00E0}", "a"),
    s(r"{\`e}", "e\u{0300}", "\u{00E8}", "e"),
    s(r"{\`i}", "i\u{0300}", "\u{00EC}", "i"),
    s(r"{\`o}", "o\u{0300}", "\u{00F2}", "o"),
    s(r"{\`u}", "u\u{0300}", "\u{00F9}", "u"),
    s(r"{\`y}", "y\u{0300}", "\u{1EF3}", "y"),
    // uppercase vowels with circumflex
    s(r"{\^A}", "A\u{0302}", "\u{00C2}", "A"),
    s(r"{\^E}", "E\u{0302}", "\u{00CA}", "E"),
    s(r"{\^I}", "I\u{0302}", "\u{00CE}", "I"),
    s(r"{\^O}", "O\u{0302}", "\u{00D4}", "O"),
    s(r"{\^U}", "U\u{0302}", "\u{00DB}", "U"),
    // lowercase vowels with circumflex
    s(r"{\^a}", "a\u{0302}", "\u{00E2}", "a"),
    s(r"{\^e}", "e\u{0302}", "\u{00EA}", "e"),
    s(r"{\^i}", "i\u{0302}", "\u{00EE}", "i"),
    s(r"{\^o}", "o\u{0302}", "\u{00F4}", "o"),
    s(r"{\^u}", "u\u{0302}", "\u{00FB}", "u"),
    // uppercase with caron
    s(r"{\v A}", "A\u{030C}", "\u{01CD}", "A"),
    s(r"{\v E}", "E\u{030C}", "\u{011A}", "E"),
    s(r"{\v I}", "I\u{030C}", "\u{01CF}", "I"),
    s(r"{\v O}", "O\u{030C}", "\u{01D1}", "O"),
    s(r"{\v U}", "U\u{030C}", "\u{01D3}", "U"),
    s(r"{\v C}", "C\u{030C}", "\u{010C}", "C"),
    s(r"{\v N}", "N\u{030C}", "\u{0147}", "N"),
    s(r"{\v S}", "S\u{030C}", "\u{0160}", "S"),
    s(r"{\v Z}", "Z\u{030C}", "\u{017D}", "Z"),
    // lowercase with caron
    s(r"{\v a}", "a\u{030C}", "\u{01CE}", "a"),
    s(r"{\v e}", "e\u{030C}", "\u{011B}", "e"),
    s(r"{\v i}", "i\u{030C}", "\u{01D0}", "i"),
    s(r"{\v o}", "o\u{030C}", "\u{01D2}", "o"),
    s(r"{\v u}", "u\u{030C}", "\u{01D4}", "u"),
    s(r"{\v c}", "c\u{030C}", "\u{010D}", "c"),
    s(r"{\v n}", "n\u{030C}", "\u{0148}", "n"),
    s(r"{\v s}", "s\u{030C}", "\u{0161}", "s"),
    s(r"{\v z}", "z\u{030C}", "\u{017E}", "z"),
    // uppercase with breve
    s(r"{\u A}", "A\u{0306}", "\u{0102}", "A"),
    s(r"{\u E}", "E\u{0306}", "\u{0114}", "E"),
    s(r"{\u I}", "I\u{0306}", "\u{012C}", "I"),
    s(r"{\u O}", "O\u{0306}", "\u{014E}", "O"),
    s(r"{\u U}", "U\u{0306}", "\u{016C}", "U"),
    // lowercase with breve
    s(r"{\u a}", "a\u{0306}", "\u{0103}", "a"),
    s(r"{\u e}", "e\u{0306}", "\u{0115}", "e"),
    s(r"{\u i}", "i\u{0306}", "\u{012D}", "i"),
    s(r"{\u o}", "o\u{0306}", "\u{014F}", "o"),
    s(r"{\u u}", "u\u{0306}", "\u{016D}", "u"),
    // uppercase with stroke
    s(r"{\A}", "\u{023A}", "\u{023A}", "A"),
    s(r"{\I}", "\u{0197}", "\u{0197}", "I"),
    s(r"{\O}", "\u{00D8}", "\u{00D8}", "O"),
    s(r"{\L}", "\u{0141}", "\u{0141}", "L"),
    s(r"{\Y}", "\u{024E}", "\u{024E}", "Y"),
    s(r"{\Z}", "\u{01B5}", "\u{01B5}", "Z"),
    // lowercase with stroke
    s(r"{\a}", "\u{2C65}", "\u{2C65}", "a"),
    s(r"{\i}", "\u{0268}", "\u{0268}", "i"),
    s(r"{\o}", "\u{00F8}", "\u{00F8}", "o"),
    s(r"{\l}", "\u{0142}", "\u{0142}", "l"),
    s(r"{\y}", "\u{024F}", "\u{024F}", "y"),
    s(r"{\z}", "\u{01B6}", "\u{01B6}", "z"),
    // uppercase with ogonek
    s(r"\k{A}", "A\u{0328}", "\u{0104}", "A"),
    s(r"\k{E}", "E\u{0328}", "\u{0118}", "E"),
    s(r"\k{I}", "I\u{0328}", "\u{012E}", "I"),
    s(r"\k{O}", "O\u{0328}", "\u{01EA}", "O"),
    s(r"\k{U}", "U\u{0328}", "\u{0172}", "U"),
    // lowercase with ogonek
    s(r"\k{a}", "a\u{0328}", "\u{0105}", "a"),
    s(r"\k{e}", "e\u{0328}", "\u{0119}", "e"),
    s(r"\k{i}", "i\u{0328}", "\u{012F}", "i"),
    s(r"\k{o}", "o\u{0328}", "\u{01EB}", "o"),
    s(r"\k{u}", "u\u{0328}", "\u{0173}", "u"),
    // tilde
    s(r"{\~A}", "A\u{0303}", "\u{00C3}", "A"),
    s(r"{\~a}", "a\u{0303}", "\u{00E3}", "a"),
    s(r"{\~N}", "N\u{0303}", "\u{00D1}", "N"),
    s(r"{\~n}", "n\u{0303}", "\u{00F1}", "n"),
    s(r"{\~O}", "O\u{0303}", "\u{00D5}", "O"),
    s(r"{\~o}", "o\u{0303}", "\u{00F5}", "o"),
    // eszett
    s(r"{\ss}", "\u{00DF}", "\u{00DF}", "ss"),
    // ring
    s(r"{\AA}", "A\u{030A}", "\u{00C5}", "A"),
    s(r"{\aa}", "a\u{030A}", "\u{00E5}", "a"),
    // ligatures
    s(r"{\AE}", "\u{00C6}", "\u{00C6}", "AE"),
    s(r"{\ae}", "\u{00E6}", "\u{00E6}", "ae"),
    s(r"{\OE}", "\u{0152}", "\u{0152}", "OE"),
    s(r"{\oe}", "\u{0153}", "\u{0153}", "oe"),
    // eth
    s(r"{\DH}", "\u{00D0}", "\u{00D0}", "dh"),
    s(r"{\dh}", "\u{00F0}", "\u{00F0}", "dh"),
    // cedilla
    s(r"{\c C}", "C\u{0327}", "\u{00C7}", "C"),
    s(r"{\c c}", "c\u{0327}", "\u{00E7}", "c"),
];

static GREEK: &[Symbol] = &[
    s(r"{$\Gamma$}", "\u{0393}", "\u{0393}", "G"),
    s(r"{$\Delta$}", "\u{0394}", "\u{0394}", "D"),
    s(r"{$\Theta$}", "\u{0398}", "\u{0398}", "Th"),
    s(r"{$\Lambda$}", "\u{039B}", "\u{039B}", "L"),
    s(r"{$\Xi$}", "\u{039E}", "\u{039E}", "X"),
    s(r"{$\Pi$}", "\u{03A0}", "\u{03A0}", "P"),
    s(r"{$\Sigma$}", "\u{03A3}", "\u{03A3}", "S"),
    s(r"{$\Phi$}", "\u{03A6}", "\u{03A6}", "Ph"),
    s(r"{$\Psi$}", "\u{03A8}", "\u{03A8}", "Ps"),
    s(r"{$\Omega$}", "\u{03A9}", "\u{03A9}", "W"),
    s(r"{$\alpha$}", "\u{03B1}", "\u{03B1}", "a"),
    s(r"{$\beta$}", "\u{03B2}", "\u{03B2}", "b"),
    s(r"{$\gamma$}", "\u{03B3}", "\u{03B3}", "g"),
    s(r"{$\delta$}", "\u{03B4}", "\u{03B4}", "d"),
    s(r"{$\epsilon$}", "\u{03B5}", "\u{03B5}", "e"),
    s(r"{$\zeta$}", "\u{03B6}", "\u{03B6}", "z"),
    s(r"{$\eta$}", "\u{03B7}", "\u{03B7}", "h"),
    s(r"{$\theta$}", "\u{03B8}", "\u{03B8}", "th"),
    s(r"{$\iota$}", "\u{03B9}", "\u{03B9}", "i"),
    s(r"{$\kappa$}", "\u{03BA}", "\u{03BA}", "k"),
    s(r"{$\lambda$}", "\u{03BB}", "\u{03BB}", "l"),
    s(r"{$\mu$}", "\u{03BC}", "\u{03BC}", "m"),
    s(r"{$\nu$}", "\u{03BD}", "\u{03BD}", "n"),
    s(r"{$\xi$}", "\u{03BE}", "\u{03BE}", "x"),
    s(r"{$\pi$}", "\u{03C0}", "\u{03C0}", "p"),
    s(r"{$\rho$}", "\u{03C1}", "\u{03C1}", "r"),
    s(r"{$\varrho$}", "\u{03F1}", "\u{03F1}", "r"),
    s(r"{$\sigma$}", "\u{03C3}", "\u{03C3}", "s"),
    s(r"{$\tau$}", "\u{03C4}", "\u{03C4}", "t"),
    s(r"{$\upsilon$}", "\u{03C5}", "\u{03C5}", "u"),
    s(r"{$\phi$}", "\u{03C6}", "\u{03C6}", "ph"),
    s(r"{$\varphi$}", "\u{03D5}", "\u{03D5}", "ph"),
    s(r"{$\chi$}", "\u{03C7}", "\u{03C7}", "ch"),
    s(r"{$\psi$}", "\u{03C8}", "\u{03C8}", "ps"),
    s(r"{$\omega$}", "\u{03C9}", "\u{03C9}", "w"),
];

// LaTeX reserved characters. Used when converting LaTeX back to plain or
// combining text. The forward direction goes through `escape_reserved`.
static RESERVED: &[Symbol] = &[
    s(r"\$", "$", "$", "$"),
    s(r"\#", "#", "#", "#"),
    s(r"\&", "&", "&", "&"),
    s(r"\_", "_", "_", "_"),
];

static SYMBOLS: &[Symbol] = &[
    s(" ", "\u{2009}", "\u{2009}", " "),
    s("`", "\u{2018}", "\u{2018}", "'"),
    s("'", "'", "\u{2019}", "'"),
    s("``", "\"", "\u{201C}", "\""),
    s("''", "\"", "\u{201D}", "\""),
    s("-", "\u{2010}", "\u{2010}", "-"),
    s("--", "\u{2013}", "\u{2013}", "--"),
    s("---", "\u{2014}", "\u{2014}", "---"),
    s(" ", " ", "\u{00A0}", " "),
    s(r"\~", "~", "\u{223C}", "~"),
    s(r"${\^\circ}$", "\u{00B0}", "\u{00B0}", "o"),
    s(r"$\times$", "\u{2715}", "\u{2715}", "x"),
];

/// Ordered table rows: Latin letters, then Greek letters and symbols when
/// requested.
pub fn mappings(greek: bool, symbols: bool) -> Vec<&'static Symbol> {
    let mut table: Vec<&'static Symbol> =
        Vec::with_capacity(LETTERS.len() + GREEK.len() + SYMBOLS.len());
    table.extend(LETTERS.iter());
    if greek {
        table.extend(GREEK.iter());
    }
    if symbols {
        table.extend(SYMBOLS.iter());
    }
    table
}

/// Replaces, row by row, every occurrence of each `from` column with the
/// `to` column.
pub fn convert_with(table: &[&Symbol], text: &str, from: &[Column], to: Column) -> String {
    let mut out = text.to_string();
    for symbol in table {
        let target = symbol.get(to);
        for column in from {
            let source = symbol.get(*column);
            if source.is_empty() || source == target || !out.contains(source) {
                continue;
            }
            out = out.replace(source, target);
        }
    }
    out
}

/// Prefixes `#`, `&` and `_` with a backslash unless already escaped or
/// inside a `$...$` math span.
pub fn escape_reserved(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_math = false;
    let mut escaped = false;
    for c in text.chars() {
        match c {
            '$' if !escaped => in_math = !in_math,
            '#' | '&' | '_' if !escaped && !in_math => out.push('\\'),
            _ => {}
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    out
}

/// Unicode to LaTeX, used for stored BibTeX values.
pub fn to_latex(text: &str) -> String {
    let escaped = escape_reserved(text);
    convert_with(&mappings(true, true), &escaped, &[Column::Unicode], Column::Latex)
}

/// Unicode to base letter plus combining modifier, used for directory names.
pub fn to_combining(text: &str) -> String {
    convert_with(&mappings(true, true), text, &[Column::Unicode], Column::Combining)
}

/// Unicode to plain ASCII, used for citekeys.
pub fn to_plain(text: &str) -> String {
    convert_with(&mappings(true, true), text, &[Column::Unicode], Column::Plain)
}

// The symbol rows carry ordinary ASCII (space, hyphen, quote) in their LaTeX
// column, so conversions starting from LaTeX skip them.
fn latex_table() -> Vec<&'static Symbol> {
    let mut table: Vec<&'static Symbol> = RESERVED.iter().collect();
    table.extend(mappings(true, false));
    table
}

/// LaTeX to plain ASCII.
pub fn latex_to_plain(text: &str) -> String {
    convert_with(&latex_table(), text, &[Column::Latex], Column::Plain)
}

/// LaTeX to combining Unicode, used to match stored values against search
/// patterns and to name author directories.
pub fn latex_to_combining(text: &str) -> String {
    convert_with(&latex_table(), text, &[Column::Latex], Column::Combining)
}
