use crate::{context::Context, error::SyntaxError, parser, util::fmt::tree};

pub const TEST_FILE: &str = "test.plume";

pub fn format_error(error: &SyntaxError) -> String {
    format!(
        "{}:{}: {}",
        error.location.line, error.location.column, error.kind
    )
}

/// Each variant contains the input.
pub enum Test {
    ParserProgram(&'static str),
    ParserExpr(&'static str),
    ParserStatements(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

/// Runs the parser on the input and returns the printed tree and the
/// formatted errors. Parsing stops at the first error, in which case the
/// tree is empty.
#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let mut ctx = Context::default();
    let result = match test {
        Test::ParserProgram(input) => parser::parse_source(&mut ctx, TEST_FILE, input)
            .map(|()| tree::print_program_string(&ctx.tree)),
        Test::ParserExpr(input) => parser::parse_expression(&mut ctx, TEST_FILE, input)
            .map(|expr| tree::print_expr_string(&ctx.tree, &expr)),
        Test::ParserStatements(input) => parser::parse_statements(&mut ctx, TEST_FILE, input)
            .map(|block| tree::print_block_string(&ctx.tree, &block)),
    };
    match result {
        Ok(tree) => (tree, vec![]),
        Err(error) => (String::new(), vec![format_error(&error)]),
    }
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors)
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind, $source_kind), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser, program), $source:expr) => {
        crate::util::test_utils::Test::ParserProgram($source)
    };
    (@@get_test(parser, expr), $source:expr) => {
        crate::util::test_utils::Test::ParserExpr($source)
    };
    (@@get_test(parser, statements), $source:expr) => {
        crate::util::test_utils::Test::ParserStatements($source)
    };
}
pub(crate) use tree_tests;
