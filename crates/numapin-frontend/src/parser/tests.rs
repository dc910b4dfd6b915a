use super::*;

fn parse(source: &str) -> TranslationUnit {
    let mut parser = Parser::new(source);
    parser.parse_translation_unit().unwrap()
}

fn only_class(unit: &TranslationUnit) -> &ClassDecl {
    unit.items
        .iter()
        .find_map(|item| match item {
            Item::Class(class) if !class.is_forward => Some(class),
            _ => None,
        })
        .expect("expected a class definition")
}

fn function_body<'a>(unit: &'a TranslationUnit, name: &str) -> &'a Body {
    unit.items
        .iter()
        .find_map(|item| match item {
            Item::Function(def) if def.decl.name == name => def.decl.body.as_ref(),
            _ => None,
        })
        .expect("expected a function definition")
}

const NODE: &str = r#"
#include <cstdio>

class Node {
    int data;
    Node* link;
public:
    Node(int d) : data(d), link(nullptr) {}
    ~Node();
    Node* getLink() const { return link; }
    virtual void setLink(Node* n);
};
"#;

#[test]
fn parse_class_members() {
    let unit = parse(NODE);
    let class = only_class(&unit);
    assert_eq!(class.key, ClassKey::Class);
    assert_eq!(class.name, "Node");
    assert!(NODE[class.span.start..class.span.end].ends_with("};"));

    let kinds: Vec<&str> = class
        .members
        .iter()
        .map(|m| match m {
            Member::Field(_) => "field",
            Member::Constructor(_) => "ctor",
            Member::Destructor(_) => "dtor",
            Member::Method(_) => "method",
            Member::AccessLabel { .. } => "access",
            Member::Passthrough { .. } => "passthrough",
            Member::Unrecognized(_) => "unrecognized",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["field", "field", "access", "ctor", "dtor", "method", "method"]
    );
}

#[test]
fn parse_pointer_field() {
    let unit = parse(NODE);
    let class = only_class(&unit);
    let Member::Field(link) = &class.members[1] else {
        panic!("expected field");
    };
    assert_eq!(link.name, "link");
    assert!(link.ty.is_single_pointer());
    assert_eq!(link.ty.to_string(), "Node*");
}

#[test]
fn parse_constructor_mem_inits() {
    let unit = parse(NODE);
    let class = only_class(&unit);
    let Member::Constructor(ctor) = &class.members[3] else {
        panic!("expected constructor");
    };
    assert_eq!(ctor.params.len(), 1);
    assert_eq!(ctor.params[0].name.as_deref(), Some("d"));
    assert_eq!(&NODE[ctor.params_span.start..ctor.params_span.end], "(int d)");
    let names: Vec<&str> = ctor.mem_inits.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["data", "link"]);
    assert!(ctor.body.is_some());
}

#[test]
fn parse_method_qualifiers() {
    let unit = parse(NODE);
    let class = only_class(&unit);
    let Member::Method(get) = &class.members[5] else {
        panic!("expected method");
    };
    assert_eq!(get.name, "getLink");
    assert!(get.qualifiers.is_const);
    assert_eq!(get.return_type.as_ref().unwrap().to_string(), "Node*");

    let Member::Method(set) = &class.members[6] else {
        panic!("expected method");
    };
    assert!(set.specifiers.is_virtual);
    assert!(set.body.is_none());
    assert_eq!(&NODE[set.decl_start..set.decl_start + 7], "virtual");
}

#[test]
fn parse_multiple_declarators() {
    let unit = parse("struct P { int x, *y, z[4]; };");
    let class = only_class(&unit);
    let fields: Vec<(&str, usize)> = class
        .members
        .iter()
        .filter_map(|m| match m {
            Member::Field(f) => Some((f.name.as_str(), f.ty.pointers.len())),
            _ => None,
        })
        .collect();
    assert_eq!(fields, vec![("x", 0), ("y", 1), ("z", 0)]);
}

#[test]
fn parse_out_of_line_definitions() {
    let source = r#"
Node::Node(int d) : data(d) { }
Node::~Node() { delete link; }
Node* Node::getLink() { return link; }
int main() { return 0; }
"#;
    let unit = parse(source);
    let defs: Vec<(Option<String>, String, FunctionKind)> = unit
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Function(def) => Some((
                def.owner.as_ref().map(|o| o.to_string()),
                def.decl.name.clone(),
                def.decl.kind,
            )),
            _ => None,
        })
        .collect();
    assert_eq!(
        defs,
        vec![
            (Some("Node".to_string()), "Node".to_string(), FunctionKind::Constructor),
            (Some("Node".to_string()), "~Node".to_string(), FunctionKind::Destructor),
            (Some("Node".to_string()), "getLink".to_string(), FunctionKind::Method),
            (None, "main".to_string(), FunctionKind::Method),
        ]
    );
}

#[test]
fn parse_pinned_allocation_site() {
    let source = "int main() { numa<MyVector*, 3> v2 = new numa<MyVector, 3>(10, 3); }";
    let unit = parse(source);
    let body = function_body(&unit, "main");
    let Stmt::VarDecl(decl) = &body.stmts[0] else {
        panic!("expected declaration");
    };
    let declarator = &decl.declarators[0];
    assert_eq!(declarator.name, "v2");
    assert_eq!(declarator.ty.to_string(), "numa<MyVector*, 3>");
    let new = declarator.init.as_ref().and_then(|i| i.as_new()).unwrap();
    assert_eq!(new.ty.to_string(), "numa<MyVector, 3>");
    let args: Vec<&str> = new
        .init
        .as_ref()
        .unwrap()
        .exprs
        .iter()
        .map(|e| e.span.text(source))
        .collect();
    assert_eq!(args, vec!["10", "3"]);
}

#[test]
fn parse_nested_template_arguments() {
    let unit = parse("numa<numa<int,1>,1>* p;");
    let Item::Variable(decl) = &unit.items[0] else {
        panic!("expected variable");
    };
    assert_eq!(decl.declarators[0].ty.to_string(), "numa<numa<int, 1>, 1>*");
}

#[test]
fn parse_news_in_nested_statements() {
    let source = r#"
void f(int n) {
    for (int i = 0; i < n; i++) {
        if (i > 2) {
            Stack* s = reinterpret_cast<Stack*>(new numa<Stack, 0>());
        } else {
            g(new Node(i), new int[n]);
        }
    }
    while (n--) numa<Node*, 1> p = new numa<Node, 1>;
}
"#;
    let unit = parse(source);
    let body = function_body(&unit, "f");
    let mut news = Vec::new();
    for stmt in &body.stmts {
        stmt.walk(&mut |s| s.for_each_new(&mut |n| news.push(n.ty.to_string())));
    }
    assert_eq!(
        news,
        vec!["numa<Stack, 0>", "Node", "int", "numa<Node, 1>"]
    );
}

#[test]
fn expression_statements_are_not_declarations() {
    let unit = parse("void f() { a < b; x = y; foo(1); std::cout << x; Node n(5); }");
    let body = function_body(&unit, "f");
    let decls = body
        .stmts
        .iter()
        .filter(|s| matches!(s, Stmt::VarDecl(_)))
        .count();
    assert_eq!(decls, 1);
}

#[test]
fn parse_aliases_and_namespaces() {
    let source = r#"
namespace ds {
    typedef class Node* NodePtr;
    using Handle = Node;
    struct Node { int v; };
}
"#;
    let unit = parse(source);
    let Item::Namespace(ns) = &unit.items[0] else {
        panic!("expected namespace");
    };
    assert_eq!(ns.name.as_deref(), Some("ds"));
    let aliases: Vec<(&str, String)> = ns
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Alias(a) => Some((a.name.as_str(), a.target.to_string())),
            _ => None,
        })
        .collect();
    assert_eq!(
        aliases,
        vec![("NodePtr", "Node*".to_string()), ("Handle", "Node".to_string())]
    );
    assert!(ns.items.iter().any(|i| matches!(i, Item::Class(c) if c.name == "Node")));
}

#[test]
fn parse_explicit_specialization() {
    let unit = parse("template<> class numa<Node, 1> { public: numa() {} };");
    let class = only_class(&unit);
    assert_eq!(class.template, TemplateHeader::Specialization);
    assert_eq!(class.name, "numa");
    let args = class.specialization_args.as_ref().unwrap();
    assert_eq!(args.len(), 2);
    assert_eq!(args[1], TemplateArg::Value("1".to_string()));
}

#[test]
fn class_template_is_marked() {
    let unit = parse("template<typename T, int N> class numa { T* p; };");
    let class = only_class(&unit);
    assert_eq!(class.template, TemplateHeader::Primary);
}

#[test]
fn forward_declaration() {
    let unit = parse("class Node;");
    let Item::Class(class) = &unit.items[0] else {
        panic!("expected class");
    };
    assert!(class.is_forward);
}

#[test]
fn passthrough_and_unrecognized_members() {
    let source = r#"
struct S {
    enum Kind { A, B };
    static const int N = 4;
    void (*callback)(int);
    friend class T;
};
"#;
    let unit = parse(source);
    let class = only_class(&unit);
    assert!(matches!(
        class.members[0],
        Member::Passthrough {
            kind: PassthroughKind::Enum,
            ..
        }
    ));
    let Member::Field(n) = &class.members[1] else {
        panic!("expected static field");
    };
    assert!(n.is_static && n.ty.is_const);
    assert!(matches!(class.members[2], Member::Unrecognized(_)));
    assert!(matches!(
        class.members[3],
        Member::Passthrough {
            kind: PassthroughKind::Friend,
            ..
        }
    ));
}

#[test]
fn missing_class_semicolon_is_an_error() {
    let mut parser = Parser::new("class A { int x; }\nint main() {}");
    let err = parser.parse_translation_unit().unwrap_err();
    assert!(matches!(err.error, ParserError::MissingClassSemicolon { .. }));
}

#[test]
fn unbalanced_brace_is_an_error() {
    let mut parser = Parser::new("void f() { if (x) { g(); }");
    let err = parser.parse_translation_unit().unwrap_err();
    assert!(matches!(err.error, ParserError::UnbalancedDelimiter { .. }));
}

#[test]
fn stray_closing_brace_is_an_error() {
    let mut parser = Parser::new("int x; }");
    let err = parser.parse_translation_unit().unwrap_err();
    assert!(matches!(err.error, ParserError::StrayClosingDelimiter { .. }));
}

#[test]
fn lexer_errors_are_kept() {
    let mut parser = Parser::new("int x = 1; /* open");
    let _ = parser.parse_translation_unit();
    assert_eq!(parser.take_lexer_errors().len(), 1);
}
