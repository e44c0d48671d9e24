use crate::diagnostics::Diagnostics;
use crate::script::ast::*;
use crate::script::builder::ScriptBuilder;
use crate::script::lexer::{lexer, ScriptToken};
use crate::script::*;
use crate::signals::{Aspect, BlockState, ConfigMode, SignalConfig};
use crate::*;
use maplit::hashmap;
use std::path::Path;
use std::sync::Arc;

const SIGCFG: &str = r#"ORTSSignalFunctions ( 1 ORTSSignalFunctionType ( "SPAD" INFO ) )
ORTSNormalSubtypes ( 1 ORTSNormalSubtype ( "Home" ) )
SignalTypes ( 3
    SignalType ( "S" SignalFnType ( NORMAL ) )
    SignalType ( "TypeA" SignalFnType ( NORMAL ) ORTSScript ( "S" ) )
    SignalType ( "TypeB" SignalFnType ( DISTANCE ) ORTSScript ( "s" ) )
)
ScriptFiles ( ScriptFile ( "nosuch_script_file.dat" ) )
"#;

fn config() -> SignalConfig {
    get_signal_config_string(SIGCFG, "sigcfg.dat", ConfigMode::Extended, &mut Diagnostics::new()).unwrap()
}

fn compile(src: &str) -> (SignalScripts, Diagnostics) {
    let mut diag = Diagnostics::new();
    let scripts = get_scripts_string(src, "sigscr.dat", &config(), &mut diag).unwrap();
    (scripts, diag)
}

fn only_script(src: &str) -> (Arc<SignalScript>, Diagnostics) {
    let (scripts, diag) = compile(src);
    assert_eq!(scripts.scripts.len(), 1);
    (scripts.scripts[0].clone(), diag)
}

fn kinds(terms: &[StatTerm]) -> Vec<(TermKind, TermOperator)> {
    terms.iter().map(|t| (t.kind.clone(), t.operator)).collect()
}

fn param(p: Parameter) -> TermKind {
    TermKind::Parameter(p)
}

fn leaf(p: Parameter) -> ConditionItem {
    let term1 = StatTerm {
        kind: param(p),
        operator: TermOperator::None,
        negate: false,
        nesting: 0,
        group: 0,
        line: 3,
    };
    ConditionItem::Leaf(Comparison { term1, negate1: false, condition: None, term2: None, negate2: false })
}

fn assignment(s: &Statement) -> &ScriptStatement {
    match s {
        Statement::Assign(a) => a,
        x => panic!("expected an assignment, got {:?}", x),
    }
}

fn condition(s: &Statement) -> &ConditionBlock {
    match s {
        Statement::Condition(c) => c,
        x => panic!("expected a condition, got {:?}", x),
    }
}

#[test]
fn scenario_if_else() {
    let src = "SCRIPT S
EXTERN FLOAT STATE
FLOAT myvar
IF ( STATE == SIGASP_STOP ) {
    myvar = 1 + 2 * 3
} ELSE {
    STATE = SIGASP_CLEAR_1
}
";
    let (script, diag) = only_script(src);
    assert_eq!(diag.warnings().count(), 0);
    assert_eq!(script.local_floats, hashmap!{ "MYVAR".to_string() => 0 });
    assert_eq!(script.statements.len(), 1);

    let block = condition(&script.statements[0]);
    assert_eq!(block.conditions.len(), 1);
    match &block.conditions[0] {
        ConditionItem::Leaf(c) => {
            assert_eq!(c.term1.kind, param(Parameter::ExternalFloat(ExternalFloat::State)));
            assert_eq!(c.condition, Some(TermCondition::EQ));
            assert_eq!(c.term2.as_ref().map(|t| t.kind.clone()),
                       Some(param(Parameter::SignalAspect(Aspect::Stop))));
        }
        x => panic!("unexpected {:?}", x),
    }

    assert_eq!(block.if_block.len(), 1);
    let s = assignment(&block.if_block[0]);
    assert_eq!(s.target, Some(AssignTarget::LocalFloat(0)));
    assert_eq!(kinds(&s.terms),
               vec![(param(Parameter::Constant(1)), TermOperator::None),
                    (param(Parameter::Constant(2)), TermOperator::Plus),
                    (param(Parameter::Constant(3)), TermOperator::Multiply)]);

    assert!(block.else_if_blocks.is_empty());
    let otherwise = block.else_block.as_ref().unwrap();
    assert_eq!(otherwise.len(), 1);
    let s = assignment(&otherwise[0]);
    assert_eq!(s.target, Some(AssignTarget::ExternalFloat(ExternalFloat::State)));
    assert_eq!(kinds(&s.terms), vec![(param(Parameter::SignalAspect(Aspect::Clear1)), TermOperator::None)]);
}

#[test]
fn float_slots_follow_declaration_order() {
    let (script, _) = only_script("SCRIPT F\nFLOAT A, B\nFLOAT a\nFLOAT C\n");
    assert_eq!(script.local_floats,
               hashmap!{
                   "A".to_string() => 0,
                   "B".to_string() => 1,
                   "C".to_string() => 2,
               });

    let config = config();
    let mut diag = Diagnostics::new();
    let mut builder = ScriptBuilder::new(&config, &mut diag, "test.dat");
    let slots: Vec<usize> = ["x", "y", "X", "z", "y"].iter().map(|n| builder.declare_float(n)).collect();
    assert_eq!(slots, vec![0, 1, 0, 2, 1]);
}

#[test]
fn parameter_resolution_is_total() {
    let config = config();
    let mut diag = Diagnostics::new();
    let mut builder = ScriptBuilder::new(&config, &mut diag, "test.dat");
    builder.declare_float("Mine");
    let resolved: Vec<Parameter> = ["12", "#5", "-3", "2.7", "block_clear", "SIGASP_CLEAR_2", "SIGFN_DISTANCE",
                                    "SIGFN_SPAD", "ORSUBTYPE_HOME", "SIGFEAT_USER1", "approach_control_req_speed",
                                    "MINE", "SIGASP_GREEN", "", "???"]
        .iter()
        .map(|t| builder.resolve_parameter(t, 7))
        .collect();
    drop(builder);
    assert_eq!(resolved,
               vec![Parameter::Constant(12),
                    Parameter::Constant(5),
                    Parameter::Constant(-3),
                    Parameter::Constant(0),
                    Parameter::BlockState(BlockState::Clear),
                    Parameter::SignalAspect(Aspect::Clear2),
                    Parameter::SignalFunction(1),
                    Parameter::SignalFunction(8),
                    Parameter::NormalSubtype(0),
                    Parameter::SignalFeature(6),
                    Parameter::ExternalFloat(ExternalFloat::ApproachControlReqSpeed),
                    Parameter::LocalFloat(0),
                    Parameter::Constant(0),
                    Parameter::Constant(0),
                    Parameter::Constant(0)]);
    assert_eq!(diag.warnings().count(), 4);
    assert!(diag.contains("Unknown parameter : 2.7"));
    assert!(diag.contains("Unknown SIGASP_ : SIGASP_GREEN"));
    assert!(diag.contains("Unknown parameter : ???"));
    assert!(diag.records.iter().all(|d| d.line == 7));
}

#[test]
fn parameter_payloads() {
    assert_eq!(Parameter::SignalAspect(Aspect::Approach1).payload(), 3);
    assert_eq!(Parameter::ExternalFloat(ExternalFloat::DrawState).payload(), 1);
    assert_eq!(Parameter::BlockState(BlockState::JnObstructed).payload(), 2);
    assert_eq!(Parameter::Invalid.payload(), 0);
}

#[test]
fn negated_group_in_condition() {
    let src = "SCRIPT C\nFLOAT A, B, C\nIF (A && !(B || C)) { A = 1 }\n";
    let (script, diag) = only_script(src);
    assert_eq!(diag.warnings().count(), 0);
    let block = condition(&script.statements[0]);
    assert_eq!(block.conditions,
               vec![leaf(Parameter::LocalFloat(0)),
                    ConditionItem::And,
                    ConditionItem::Negate,
                    ConditionItem::Group(vec![leaf(Parameter::LocalFloat(1)),
                                              ConditionItem::Or,
                                              leaf(Parameter::LocalFloat(2))])]);
}

#[test]
fn else_if_chains() {
    let src = "SCRIPT P
FLOAT A, B, C
IF ( A ) { STATE = SIGASP_STOP }
ELSE IF ( B ) { STATE = SIGASP_APPROACH_1 }
ELSEIF ( C ) { STATE = SIGASP_CLEAR_1 }
ELSE { STATE = SIGASP_CLEAR_2 }
IF ( A ) { STATE = SIGASP_STOP }
ELSEIF ( B ) { STATE = SIGASP_RESTRICTING }
";
    let (script, _) = only_script(src);
    assert_eq!(script.statements.len(), 2);

    let first = condition(&script.statements[0]);
    assert_eq!(first.else_if_blocks.len(), 2);
    assert!(first.else_block.is_some());
    let clear = assignment(&first.else_if_blocks[1].block[0]);
    assert_eq!(kinds(&clear.terms), vec![(param(Parameter::SignalAspect(Aspect::Clear1)), TermOperator::None)]);

    let second = condition(&script.statements[1]);
    assert_eq!(second.else_if_blocks.len(), 1);
    assert!(second.else_block.is_none());
}

#[test]
fn compound_assignment_is_expanded() {
    let (script, _) = only_script("SCRIPT X\nFLOAT A\nA += 2\n");
    let s = assignment(&script.statements[0]);
    assert_eq!(s.target, Some(AssignTarget::LocalFloat(0)));
    assert_eq!(kinds(&s.terms),
               vec![(param(Parameter::LocalFloat(0)), TermOperator::None),
                    (TermKind::SubLevel, TermOperator::Plus),
                    (param(Parameter::Constant(2)), TermOperator::None)]);
    assert_eq!(s.terms[1].group, 1);
    assert_eq!(s.terms[2].nesting, 1);
}

#[test]
fn leading_signs_fold_into_operands() {
    let src = "SCRIPT N
FLOAT A, B
IF ( -A == -1 ) { B = -A + 2 }
B = ( -3 )
B = +A
";
    let (script, diag) = only_script(src);
    assert_eq!(diag.warnings().count(), 0);
    assert_eq!(script.statements.len(), 3);

    let block = condition(&script.statements[0]);
    match &block.conditions[..] {
        [ConditionItem::Leaf(c)] => {
            assert_eq!(c.term1.kind, param(Parameter::LocalFloat(0)));
            assert_eq!(c.term1.operator, TermOperator::Minus);
            assert!(!c.negate1);
            assert_eq!(c.condition, Some(TermCondition::EQ));
            let term2 = c.term2.as_ref().unwrap();
            assert_eq!(term2.kind, param(Parameter::Constant(-1)));
            assert_eq!(term2.operator, TermOperator::None);
        }
        x => panic!("unexpected {:?}", x),
    }
    let s = assignment(&block.if_block[0]);
    assert_eq!(kinds(&s.terms),
               vec![(param(Parameter::LocalFloat(0)), TermOperator::Minus),
                    (param(Parameter::Constant(2)), TermOperator::Plus)]);

    let s = assignment(&script.statements[1]);
    assert_eq!(kinds(&s.terms),
               vec![(TermKind::SubLevel, TermOperator::None),
                    (param(Parameter::Constant(-3)), TermOperator::None)]);
    let s = assignment(&script.statements[2]);
    assert_eq!(kinds(&s.terms), vec![(param(Parameter::LocalFloat(0)), TermOperator::None)]);
}

#[test]
fn signed_name_in_call_arguments_warns() {
    let (script, diag) = only_script("SCRIPT G
STATE = NEXT_SIG_LR(-SIGFN_NORMAL)
");
    assert!(diag.contains("Ignored sign on parameter -SIGFN_NORMAL"));
    let s = assignment(&script.statements[0]);
    match &s.terms[0].kind {
        TermKind::Function(_, params) => assert_eq!(params.as_slice(), &[Parameter::SignalFunction(0)]),
        x => panic!("unexpected {:?}", x),
    }
}

#[test]
fn operator_opening_a_line_continues_the_statement() {
    let src = "SCRIPT K
FLOAT A, B
A = 1
+ 2;
B = A
B = 3
";
    let (script, diag) = only_script(src);
    assert_eq!(diag.warnings().count(), 0);
    assert_eq!(script.statements.len(), 3);
    let s = assignment(&script.statements[0]);
    assert_eq!(s.target, Some(AssignTarget::LocalFloat(0)));
    assert_eq!(kinds(&s.terms),
               vec![(param(Parameter::Constant(1)), TermOperator::None),
                    (param(Parameter::Constant(2)), TermOperator::Plus)]);
    let s = assignment(&script.statements[1]);
    assert_eq!(kinds(&s.terms), vec![(param(Parameter::LocalFloat(0)), TermOperator::None)]);
}

#[test]
fn block_comment_after_code_ends_the_line() {
    let src = "SCRIPT L
FLOAT A, B
A = 1 /* note
   continues */
B = 2
";
    let (script, diag) = only_script(src);
    assert_eq!(diag.warnings().count(), 0);
    assert_eq!(script.statements.len(), 2);
    let s = assignment(&script.statements[0]);
    assert_eq!(s.target, Some(AssignTarget::LocalFloat(0)));
    assert_eq!(kinds(&s.terms), vec![(param(Parameter::Constant(1)), TermOperator::None)]);
    let s = assignment(&script.statements[1]);
    assert_eq!(s.target, Some(AssignTarget::LocalFloat(1)));
    assert_eq!(kinds(&s.terms), vec![(param(Parameter::Constant(2)), TermOperator::None)]);
}

#[test]
fn function_calls() {
    let src = "SCRIPT X\nSTATE = NEXT_SIG_LR(SIGFN_NORMAL)\nDRAW_STATE = DEF_DRAW_STATE(STATE)\n";
    let (script, diag) = only_script(src);
    assert_eq!(diag.warnings().count(), 0);
    let s = assignment(&script.statements[0]);
    match &s.terms[0].kind {
        TermKind::Function(f, params) => {
            assert_eq!(*f, ExternalFunction::NextSigLr);
            assert_eq!(params.as_slice(), &[Parameter::SignalFunction(0)]);
        }
        x => panic!("unexpected {:?}", x),
    }
    let s = assignment(&script.statements[1]);
    assert_eq!(s.target, Some(AssignTarget::ExternalFloat(ExternalFloat::DrawState)));
}

#[test]
fn recoverable_problems_warn() {
    let src = "SCRIPT W
XYZ = 1
STATE == SIGASP_STOP
STATE = FOO(1)
";
    let (script, diag) = only_script(src);
    assert!(diag.contains("Unknown assignment target XYZ, statement ignored"));
    assert!(diag.contains("Assignment operator == corrected to ="));
    assert!(diag.contains("Unknown function call : FOO"));
    assert_eq!(script.statements.len(), 2);
    let s = assignment(&script.statements[1]);
    assert_eq!(kinds(&s.terms), vec![(param(Parameter::Invalid), TermOperator::None)]);
}

#[test]
fn nested_call_in_parameters_fails() {
    let config = config();
    let mut diag = Diagnostics::new();
    let mut scripts = SignalScripts::new();
    let src = "SCRIPT N\nSTATE = NEXT_SIG_LR(THIS_SIG_LR(SIGFN_NORMAL))\n";
    match scripts.load_file(src, "sigscr.dat", &config, &mut diag) {
        Err(ScriptError::NestedFunctionCall { line, function }) => {
            assert_eq!(line, 2);
            assert_eq!(function, "NEXT_SIG_LR");
        }
        x => panic!("unexpected {:?}", x),
    }
    assert!(scripts.scripts.is_empty());
}

#[test]
fn sections_split_the_file() {
    let src = "leading junk\nSCRIPT One\nSTATE = SIGASP_STOP\nREM SCRIPT Two\nSTATE = SIGASP_CLEAR_1\nSCRIPT Three\n";
    let (scripts, _) = compile(src);
    let names: Vec<&str> = scripts.scripts.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["ONE", "THREE"]);
    assert_eq!(scripts.scripts[0].statements.len(), 1);
    assert!(scripts.scripts[1].statements.is_empty());
}

#[test]
fn shared_script_attachment() {
    let (mut scripts, diag) = compile("SCRIPT S\nSTATE = SIGASP_STOP\n");
    assert_eq!(diag.warnings().count(), 0);
    assert_eq!(scripts.by_type.len(), 3);
    let a = scripts.script_for("TypeA").unwrap().clone();
    let b = scripts.script_for("typeb").unwrap().clone();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, scripts.script_for("S").unwrap()));

    // attaching the same compiled script again changes nothing
    let mut diag = Diagnostics::new();
    let config = config();
    assert!(!scripts.allocate(a.clone(), &config, &mut diag, "sigscr.dat", 1));
    assert!(diag.is_empty());

    // a second script of the same name loses to the first
    scripts.load_file("SCRIPT S\nSTATE = SIGASP_CLEAR_2\n", "other.dat", &config, &mut diag).unwrap();
    assert_eq!(scripts.scripts.len(), 2);
    assert!(Arc::ptr_eq(scripts.script_for("typea").unwrap(), &a));
    assert_eq!(diag.warnings().count(), 3);
    assert!(diag.contains("Ignored duplicate SignalType script S for typea"));
}

#[test]
fn unreadable_script_files_are_skipped() {
    let config = config();
    let mut diag = Diagnostics::new();
    let scripts = load_scripts(Path::new("/nonexistent-script-dir"), &config, &mut diag);
    assert!(scripts.scripts.is_empty());
    assert!(diag.contains("Skipped script file"));
}

#[test]
fn lexer_comments() {
    let tokens: Vec<ScriptToken> = lexer(&mut "a /* x * y **/ b\n// gone\nc".chars())
        .unwrap()
        .into_iter()
        .map(|t| t.token)
        .collect();
    assert_eq!(tokens,
               vec![ScriptToken::Value("A".to_string()),
                    ScriptToken::Value("B".to_string()),
                    ScriptToken::LineEnd,
                    ScriptToken::Value("C".to_string()),
                    ScriptToken::LineEnd,
                    ScriptToken::EOF]);
}

#[test]
fn lexer_comment_spanning_lines() {
    let tokens: Vec<(ScriptToken, usize)> = lexer(&mut "a /* x\n y */\nb".chars())
        .unwrap()
        .into_iter()
        .map(|t| (t.token, t.line))
        .collect();
    assert_eq!(tokens,
               vec![(ScriptToken::Value("A".to_string()), 1),
                    (ScriptToken::LineEnd, 1),
                    (ScriptToken::Value("B".to_string()), 3),
                    (ScriptToken::LineEnd, 3),
                    (ScriptToken::EOF, 3)]);
}

#[test]
fn lexer_operators() {
    let tokens: Vec<ScriptToken> = lexer(&mut "A>=#B AND !C".chars())
        .unwrap()
        .into_iter()
        .map(|t| t.token)
        .collect();
    assert_eq!(tokens,
               vec![ScriptToken::Value("A".to_string()),
                    ScriptToken::Operator(">=#".to_string()),
                    ScriptToken::Value("B".to_string()),
                    ScriptToken::Operator("AND".to_string()),
                    ScriptToken::Operator("!".to_string()),
                    ScriptToken::Value("C".to_string()),
                    ScriptToken::LineEnd,
                    ScriptToken::EOF]);
}
