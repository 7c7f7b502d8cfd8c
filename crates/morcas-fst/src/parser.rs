// Rule-language parser.
//
// Both file kinds are line based. `#` starts a comment anywhere on a line.
// Every malformed line is reported; parsing does not stop at the first one.
//
// .fst lines:
//   Name = {a, b, c}          class declaration
//   Name = Other - {a}        derived class (also `Other-a,b`, `A-B`, `A&B`)
//   -> state                  start state
//   src -> dst [labels] [w]   transition; no labels means epsilon
//   src ->                    src is final
//
// .cas lines:
//   weighting = MODE
//   cascade name = {0, 2}
//   Name = {a, b}
//   >stage<

use smol_str::SmolStr;

use crate::grammar::{
    CascadeGrammar, ClassDecl, ClassExpr, FstGrammar, FstItem, LabelSpec, Pattern, Rule,
    StageRef, SubcascadeDecl, WeightingDecl,
};
use crate::{CompileError, SourceLocation};

const ARROW: &str = "->";

/// Parse the text of one `.fst` file.
pub fn parse_fst(name: &str, text: &str) -> Result<FstGrammar, CompileError> {
    let mut items = Vec::new();
    let mut errors = Vec::new();
    let mut last_line = 0;

    for (line, content) in significant_lines(text) {
        last_line = line;
        let location = || SourceLocation::new(name, line);
        let parsed = if content.starts_with(ARROW) {
            parse_start(&content[ARROW.len()..], line)
        } else if content.contains(ARROW) {
            parse_rule(content, line).map(FstItem::Rule)
        } else if content.contains('=') {
            parse_class_decl(content, line).map(FstItem::Class)
        } else {
            Err("expected a class declaration or a transition".to_string())
        };
        match parsed {
            Ok(item) => items.push(item),
            Err(message) => errors.push(CompileError::syntax(location(), message)),
        }
    }

    if errors.is_empty() && !items.iter().any(|item| matches!(item, FstItem::Rule(_))) {
        errors.push(CompileError::syntax(
            SourceLocation::new(name, last_line.max(1)),
            "no transitions",
        ));
    }
    if !errors.is_empty() {
        return Err(CompileError::from_many(errors));
    }
    Ok(FstGrammar {
        name: SmolStr::new(name),
        items,
    })
}

/// Parse the text of one `.cas` file.
pub fn parse_cascade(name: &str, text: &str) -> Result<CascadeGrammar, CompileError> {
    let mut grammar = CascadeGrammar {
        name: SmolStr::new(name),
        weighting: None,
        classes: Vec::new(),
        subcascades: Vec::new(),
        stages: Vec::new(),
    };
    let mut errors = Vec::new();
    let mut last_line = 0;

    for (line, content) in significant_lines(text) {
        last_line = line;
        let result = parse_cascade_line(&mut grammar, content, line);
        if let Err(message) = result {
            errors.push(CompileError::syntax(SourceLocation::new(name, line), message));
        }
    }

    if errors.is_empty() && grammar.stages.is_empty() {
        errors.push(CompileError::syntax(
            SourceLocation::new(name, last_line.max(1)),
            "cascade declares no stages",
        ));
    }
    if !errors.is_empty() {
        return Err(CompileError::from_many(errors));
    }
    Ok(grammar)
}

fn parse_cascade_line(
    grammar: &mut CascadeGrammar,
    content: &str,
    line: usize,
) -> Result<(), String> {
    if let Some(stage) = delimited(content, '>', '<') {
        let name = single_token(stage).ok_or("expected a stage name between `>` and `<`")?;
        grammar.stages.push(StageRef {
            name: SmolStr::new(name),
            line,
        });
    } else if delimited(content, '+', '+').is_some() {
        return Err("lexicon stages are not supported".to_string());
    } else if let Some(mode) = keyword_value(content, "weighting") {
        if mode.is_empty() {
            return Err("expected a weighting mode".to_string());
        }
        if grammar.weighting.is_some() {
            return Err("weighting declared twice".to_string());
        }
        grammar.weighting = Some(WeightingDecl {
            mode: mode.to_string(),
            line,
        });
    } else if let Some(rest) = content.strip_prefix("cascade").filter(|r| r.starts_with(char::is_whitespace)) {
        grammar.subcascades.push(parse_subcascade(rest, line)?);
    } else if content.contains('=') {
        grammar.classes.push(parse_class_decl(content, line)?);
    } else {
        return Err("expected a stage, a class or a directive".to_string());
    }
    Ok(())
}

/// Numbered lines with comments stripped, skipping blank ones.
fn significant_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(i, raw)| {
        let content = raw.split('#').next().unwrap_or_default().trim();
        (!content.is_empty()).then_some((i + 1, content))
    })
}

fn single_token(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty() && !s.contains(char::is_whitespace)).then_some(s)
}

/// `open inner close`, with nothing else on the line.
fn delimited(content: &str, open: char, close: char) -> Option<&str> {
    content.strip_prefix(open)?.strip_suffix(close)
}

/// `keyword = value`
fn keyword_value<'a>(content: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = content.strip_prefix(keyword)?.trim_start();
    Some(rest.strip_prefix('=')?.trim())
}

fn parse_start(rest: &str, line: usize) -> Result<FstItem, String> {
    let name = single_token(rest).ok_or("expected a state name after `->`")?;
    Ok(FstItem::Start {
        name: SmolStr::new(name),
        line,
    })
}

fn parse_subcascade(rest: &str, line: usize) -> Result<SubcascadeDecl, String> {
    let (name, body) = rest
        .split_once('=')
        .ok_or("expected `cascade name = {i, j, ...}`")?;
    let name = single_token(name).ok_or("expected a subcascade name")?;
    let body = delimited(body.trim(), '{', '}').ok_or("expected `{` ... `}` after `=`")?;
    let indices = body
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| format!("invalid stage index `{s}`"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SubcascadeDecl {
        name: SmolStr::new(name),
        indices,
        line,
    })
}

fn parse_class_decl(content: &str, line: usize) -> Result<ClassDecl, String> {
    let (name, expr) = content
        .split_once('=')
        .ok_or("expected `Name = ...`")?;
    let name = single_token(name).ok_or("expected a class name before `=`")?;
    if name.contains(['[', ']', '{', '}', ';', ':']) {
        return Err(format!("invalid class name `{name}`"));
    }
    Ok(ClassDecl {
        name: SmolStr::new(name),
        expr: parse_class_expr(expr)?,
        line,
    })
}

fn parse_rule(content: &str, line: usize) -> Result<Rule, String> {
    let (source, rest) = content
        .split_once(ARROW)
        .ok_or("expected `->`")?;
    let source = single_token(source).ok_or("expected a single source state before `->`")?;
    let rest = rest.trim();

    let target_end = rest
        .find(|c: char| c.is_whitespace() || c == '[')
        .unwrap_or(rest.len());
    let target = &rest[..target_end];
    let rest = rest[target_end..].trim();

    if target.is_empty() {
        if !rest.is_empty() {
            return Err("a final-state rule takes no labels".to_string());
        }
        return Ok(Rule {
            source: SmolStr::new(source),
            target: None,
            labels: Vec::new(),
            weight: None,
            line,
        });
    }

    let (labels, weight) = if rest.is_empty() {
        (vec![LabelSpec::epsilon()], None)
    } else {
        let (group, after) = bracket_group(rest)?;
        let labels = parse_labels(group)?;
        let after = after.trim();
        let weight = if after.is_empty() {
            None
        } else if after.starts_with('[') {
            Some(after.to_string())
        } else {
            return Err(format!("unexpected `{after}` after label list"));
        };
        (labels, weight)
    };

    Ok(Rule {
        source: SmolStr::new(source),
        target: Some(SmolStr::new(target)),
        labels,
        weight,
        line,
    })
}

/// Split `[inner] rest` at the bracket matching the first `[`.
fn bracket_group(s: &str) -> Result<(&str, &str), String> {
    if !s.starts_with('[') {
        return Err(format!("expected `[` but found `{s}`"));
    }
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&s[1..i], &s[i + 1..]));
                }
            }
            _ => {}
        }
    }
    Err("unbalanced `[`".to_string())
}

/// Split on `sep` outside `{...}`.
fn split_outside_braces(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn parse_labels(group: &str) -> Result<Vec<LabelSpec>, String> {
    if group.trim().is_empty() {
        return Ok(vec![LabelSpec::epsilon()]);
    }
    split_outside_braces(group, ';')
        .into_iter()
        .map(|component| {
            let component = component.trim();
            if component.is_empty() {
                return Err("empty label in label list".to_string());
            }
            match split_outside_braces(component, ':').as_slice() {
                [identity] => Ok(LabelSpec {
                    input: parse_pattern(identity)?,
                    output: None,
                }),
                [input, output] => Ok(LabelSpec {
                    input: parse_pattern(input)?,
                    output: Some(parse_pattern(output)?),
                }),
                _ => Err(format!("label `{component}` has more than one `:`")),
            }
        })
        .collect()
}

fn parse_pattern(side: &str) -> Result<Pattern, String> {
    let side = side.trim();
    if side.is_empty() {
        return Ok(Pattern::Epsilon);
    }
    if side.contains(char::is_whitespace) {
        return Err(format!("unexpected whitespace in label `{side}`"));
    }
    if looks_like_class_expr(side) {
        return parse_class_expr(side).map(Pattern::Class);
    }
    Ok(Pattern::Name(SmolStr::new(side)))
}

/// `{..}`, or `-` / `&` between two non-empty operands.
fn looks_like_class_expr(side: &str) -> bool {
    if side.starts_with('{') {
        return true;
    }
    side.char_indices().any(|(i, c)| {
        (c == '-' || c == '&') && i > 0 && i + c.len_utf8() < side.len()
    })
}

/// Parse `A`, `{a, b}`, `A-b`, `A-b,c`, `A - {b}`, `A-B`, `A&B`.
/// Operators associate to the left.
pub(crate) fn parse_class_expr(text: &str) -> Result<ClassExpr, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty class expression".to_string());
    }
    let mut operands: Vec<&str> = Vec::new();
    let mut operators: Vec<char> = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                if depth == 0 {
                    return Err("unbalanced `}`".to_string());
                }
                depth -= 1;
            }
            '-' | '&' if depth == 0 => {
                operands.push(&text[start..i]);
                operators.push(c);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced `{`".to_string());
    }
    operands.push(&text[start..]);

    let mut operands = operands.into_iter();
    let mut expr = parse_operand(operands.next().unwrap_or_default())?;
    for (op, operand) in operators.into_iter().zip(operands) {
        let right = Box::new(parse_operand(operand)?);
        expr = match op {
            '-' => ClassExpr::Difference(Box::new(expr), right),
            _ => ClassExpr::Intersection(Box::new(expr), right),
        };
    }
    Ok(expr)
}

fn parse_operand(text: &str) -> Result<ClassExpr, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("missing operand in class expression".to_string());
    }
    if let Some(inner) = delimited(text, '{', '}') {
        return Ok(ClassExpr::Enumerated(member_list(inner)));
    }
    if text.contains(['{', '}']) {
        return Err(format!("malformed class operand `{text}`"));
    }
    if text.contains(',') {
        return Ok(ClassExpr::Enumerated(member_list(text)));
    }
    if text.contains(char::is_whitespace) {
        return Err(format!("unexpected whitespace in `{text}`"));
    }
    Ok(ClassExpr::Named(SmolStr::new(text)))
}

fn member_list(text: &str) -> Vec<SmolStr> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SmolStr::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Pattern {
        Pattern::Name(s.into())
    }

    fn only_rule(text: &str) -> Rule {
        let grammar = parse_fst("t.fst", text).unwrap();
        grammar.rules().next().unwrap().clone()
    }

    #[test]
    fn class_declarations() {
        let g = parse_fst(
            "t.fst",
            "X = {b, bW, c}\nXb = X - {b}\nY = X-b,c\nZ = X&Y\ns -> e [X]\ne ->\n",
        )
        .unwrap();
        let decls: Vec<_> = g
            .items
            .iter()
            .filter_map(|i| match i {
                FstItem::Class(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(decls.len(), 4);
        assert_eq!(
            decls[0].expr,
            ClassExpr::Enumerated(vec!["b".into(), "bW".into(), "c".into()])
        );
        assert_eq!(
            decls[2].expr,
            ClassExpr::Difference(
                Box::new(ClassExpr::Named("X".into())),
                Box::new(ClassExpr::Enumerated(vec!["b".into(), "c".into()])),
            )
        );
        assert!(matches!(decls[3].expr, ClassExpr::Intersection(..)));
    }

    #[test]
    fn final_and_epsilon_rules() {
        let g = parse_fst("t.fst", "start -> mid\nmid -> end []\nend ->\n").unwrap();
        let rules: Vec<_> = g.rules().collect();
        assert_eq!(rules[0].labels, vec![LabelSpec::epsilon()]);
        assert_eq!(rules[1].labels, vec![LabelSpec::epsilon()]);
        assert_eq!(rules[2].target, None);
        assert_eq!(rules[2].line, 3);
    }

    #[test]
    fn label_forms() {
        let r = only_rule("s -> t [a;X:b;a:;:b;X-b;_]\n");
        assert_eq!(
            r.labels,
            vec![
                LabelSpec { input: name("a"), output: None },
                LabelSpec { input: name("X"), output: Some(name("b")) },
                LabelSpec { input: name("a"), output: Some(Pattern::Epsilon) },
                LabelSpec { input: Pattern::Epsilon, output: Some(name("b")) },
                LabelSpec {
                    input: Pattern::Class(ClassExpr::Difference(
                        Box::new(ClassExpr::Named("X".into())),
                        Box::new(ClassExpr::Named("b".into())),
                    )),
                    output: None,
                },
                LabelSpec { input: name("_"), output: None },
            ]
        );
    }

    #[test]
    fn weight_and_comments() {
        let r = only_rule("s -> t [a:b] [pos=v,-neg]   # but not |\n");
        assert_eq!(r.weight.as_deref(), Some("[pos=v,-neg]"));
        let r = only_rule("# header\n\ns -> t[a]\n");
        assert_eq!(r.target.as_deref(), Some("t"));
        assert_eq!(r.line, 3);
    }

    #[test]
    fn start_declaration() {
        let g = parse_fst("t.fst", "-> q0\nq1 -> q0 [a]\nq0 ->\n").unwrap();
        assert_eq!(
            g.items[0],
            FstItem::Start { name: "q0".into(), line: 1 }
        );
    }

    #[test]
    fn all_malformed_lines_are_reported() {
        let err = parse_fst("t.fst", "garbage\ns -> t [a\nok -> t [a]\nx y -> t\n").unwrap_err();
        let lines: Vec<usize> = err
            .errors()
            .iter()
            .map(|e| match e {
                CompileError::Syntax { location, .. } => location.line,
                _ => 0,
            })
            .collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn comment_only_file_is_an_error() {
        let err = parse_fst("t.fst", "# nothing here\n\n").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
        assert!(err.to_string().contains("no transitions"));
    }

    #[test]
    fn cascade_file() {
        let text = "\
weighting = UNIFICATION
V = {a, e, i}
cascade phon = {0, 2}
>delGS<
>epen2<   # second
>epen1<
";
        let g = parse_cascade("am.cas", text).unwrap();
        assert_eq!(g.weighting.as_ref().unwrap().mode, "UNIFICATION");
        assert_eq!(g.classes[0].name, "V");
        assert_eq!(g.subcascades[0].indices, vec![0, 2]);
        let stages: Vec<&str> = g.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(stages, vec!["delGS", "epen2", "epen1"]);
    }

    #[test]
    fn cascade_errors() {
        assert!(parse_cascade("x.cas", "weighting = TROPICAL\n").is_err());
        let err = parse_cascade("x.cas", "+lex+\n>a<\n").unwrap_err();
        assert!(err.to_string().contains("not supported"));
        let err = parse_cascade("x.cas", "cascade s = {0, x}\n>a<\n").unwrap_err();
        assert!(err.to_string().contains("invalid stage index"));
    }

    #[test]
    fn class_expr_parsing() {
        assert_eq!(
            parse_class_expr("A - {b, c}").unwrap(),
            ClassExpr::Difference(
                Box::new(ClassExpr::Named("A".into())),
                Box::new(ClassExpr::Enumerated(vec!["b".into(), "c".into()])),
            )
        );
        assert!(parse_class_expr("A -").is_err());
        assert!(parse_class_expr("{a, b").is_err());
        assert_eq!(parse_class_expr("{}").unwrap(), ClassExpr::Enumerated(vec![]));
    }
}
