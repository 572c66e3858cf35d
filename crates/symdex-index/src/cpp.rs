//! Syntactic C/C++ frontend built on tree-sitter-cpp.
//!
//! The tree-sitter-cpp grammar is a superset that covers both C and C++, so
//! this single frontend handles `.c`, `.h`, `.cpp`, `.hpp`, `.cc`, `.cxx`,
//! and `.hxx` files.
//!
//! The frontend walks the syntax tree twice. The first pass collects the
//! declarations of the unit (classes with their bases, methods and fields,
//! free functions, globals, named types) so that the second pass can resolve
//! calls, base specifiers, override links, and variable references by name.
//! USRs are synthesized as kind-tagged qualified names (`t:`, `f:`, `v:`),
//! which is stable across runs; a semantic frontend with real USRs can be
//! substituted through the `Frontend` trait without touching the builder.

use crate::frontend::{EntityInfo, Frontend, IndexEvent, SourcePos};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use symdex_core::{FrontendConfig, IndexError};
use tree_sitter::{Node, Parser};

/// Tree-sitter based C/C++ frontend.
pub struct CppFrontend {
    config: FrontendConfig,
}

impl CppFrontend {
    pub fn new() -> Self {
        Self {
            config: FrontendConfig::default(),
        }
    }

    pub fn with_config(config: FrontendConfig) -> Self {
        Self { config }
    }

    /// Parse source bytes directly, without touching the filesystem.
    pub fn parse_source(
        &self,
        path: &str,
        source: &[u8],
        args: &[String],
    ) -> Result<Vec<IndexEvent>, IndexError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .map_err(|e| IndexError::FrontendFailed(format!("tree-sitter-cpp: {e}")))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| IndexError::FrontendFailed(format!("failed to parse {path}")))?;

        let in_system = self.is_system_path(path, args);
        let mut walker = UnitWalker::new(path, source, in_system);
        let mut scope = Vec::new();
        walker.collect(tree.root_node(), &mut scope);
        debug_assert!(scope.is_empty());
        walker.emit(tree.root_node(), &mut scope, None);
        Ok(walker.events)
    }

    /// True when `path` lies under a configured system prefix or one passed
    /// via `-isystem`.
    fn is_system_path(&self, path: &str, args: &[String]) -> bool {
        if self
            .config
            .system_include_prefixes
            .iter()
            .any(|p| path.starts_with(p.as_str()))
        {
            return true;
        }
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let prefix = if arg == "-isystem" {
                iter.next().cloned()
            } else {
                arg.strip_prefix("-isystem").map(str::to_string)
            };
            if let Some(prefix) = prefix {
                if !prefix.is_empty() && path.starts_with(prefix.as_str()) {
                    return true;
                }
            }
        }
        false
    }
}

impl Default for CppFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for CppFrontend {
    fn name(&self) -> &str {
        "tree-sitter-cpp"
    }

    fn file_extensions(&self) -> &[&str] {
        &["c", "h", "cpp", "hpp", "cc", "cxx", "hxx"]
    }

    fn parse_unit(&self, path: &Path, args: &[String]) -> Result<Vec<IndexEvent>, IndexError> {
        let source = std::fs::read(path)
            .map_err(|e| IndexError::FrontendFailed(format!("{}: {e}", path.display())))?;
        self.parse_source(&path.to_string_lossy(), &source, args)
    }
}

/// Declarations of one class collected in the first pass.
#[derive(Debug, Default)]
struct ClassInfo {
    /// Base class qualified names, in declaration order.
    bases: Vec<String>,
    /// Simple names of methods declared in the class body.
    methods: Vec<String>,
    /// Simple names of data members.
    fields: Vec<String>,
}

/// Traversal context inside a function body or an initializer.
struct BodyCtx {
    /// The enclosing function, or `None` in non-function contexts such as
    /// global initializers.
    func: Option<EntityInfo>,
    /// Locals and parameters declared so far: simple name -> qualified name.
    locals: HashMap<String, String>,
}

struct UnitWalker<'a> {
    path: &'a str,
    source: &'a [u8],
    in_system: bool,

    classes: HashMap<String, ClassInfo>,
    known_types: HashSet<String>,
    funcs_by_name: HashMap<String, Vec<String>>,
    globals: HashMap<String, String>,

    events: Vec<IndexEvent>,
}

impl<'a> UnitWalker<'a> {
    fn new(path: &'a str, source: &'a [u8], in_system: bool) -> Self {
        Self {
            path,
            source,
            in_system,
            classes: HashMap::new(),
            known_types: HashSet::new(),
            funcs_by_name: HashMap::new(),
            globals: HashMap::new(),
            events: Vec::new(),
        }
    }

    // ── Pass 1: collect declarations ──────────────────────────────────────

    fn collect(&mut self, node: Node, scope: &mut Vec<String>) {
        match node.kind() {
            "namespace_definition" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                if let Some(body) = node.child_by_field_name("body") {
                    let pushed = !name.is_empty();
                    if pushed {
                        scope.push(name);
                    }
                    for child in children(body) {
                        self.collect(child, scope);
                    }
                    if pushed {
                        scope.pop();
                    }
                }
                return;
            }
            "class_specifier" | "struct_specifier" => {
                self.collect_class(node, scope);
                return;
            }
            "enum_specifier" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let qn = join_scope(scope, &self.text(name_node));
                    self.known_types.insert(qn);
                }
            }
            "alias_declaration" | "type_definition" => {
                if let Some(name) = self.alias_name(node) {
                    self.known_types.insert(join_scope(scope, &name));
                }
            }
            "function_definition" => {
                if let Some((simple, spelled)) = self.declarator_parts(node) {
                    let qn = join_scope(scope, &spelled);
                    self.funcs_by_name.entry(simple).or_default().push(qn);
                }
                // Function bodies are not collected; locals stay out of the
                // unit-level name tables.
                return;
            }
            "declaration" => {
                if let Some(declarator) = find_function_declarator(node) {
                    if let Some((simple, spelled)) = self.name_of_declarator(declarator) {
                        let qn = join_scope(scope, &spelled);
                        self.funcs_by_name.entry(simple).or_default().push(qn);
                    }
                } else {
                    for name in self.variable_declarator_names(node) {
                        let qn = join_scope(scope, &name);
                        self.globals.insert(name, qn);
                    }
                }
                // `struct S {} s;` declares the type inline.
                for child in children(node) {
                    if matches!(
                        child.kind(),
                        "class_specifier" | "struct_specifier" | "enum_specifier"
                    ) {
                        self.collect(child, scope);
                    }
                }
                return;
            }
            "template_declaration" => {
                for child in children(node) {
                    self.collect(child, scope);
                }
                return;
            }
            _ => {}
        }

        for child in children(node) {
            self.collect(child, scope);
        }
    }

    fn collect_class(&mut self, node: Node, scope: &mut Vec<String>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node);
        let qn = join_scope(scope, &name);
        self.known_types.insert(qn.clone());

        let Some(body) = node.child_by_field_name("body") else {
            // Forward declaration; nothing to collect.
            return;
        };

        let mut info = ClassInfo::default();
        for base in self.base_specifier_names(node) {
            // Bases are resolved against the class's own enclosing scope.
            info.bases.push(self.resolve_type_name(&base, scope));
        }

        scope.push(name);
        for child in children(body) {
            match child.kind() {
                "function_definition" => {
                    if let Some((simple, spelled)) = self.declarator_parts(child) {
                        let method_qn = join_scope(scope, &spelled);
                        info.methods.push(simple.clone());
                        self.funcs_by_name.entry(simple).or_default().push(method_qn);
                    }
                }
                "field_declaration" => {
                    if let Some(declarator) = find_function_declarator(child) {
                        if let Some((simple, spelled)) = self.name_of_declarator(declarator) {
                            let method_qn = join_scope(scope, &spelled);
                            info.methods.push(simple.clone());
                            self.funcs_by_name.entry(simple).or_default().push(method_qn);
                        }
                    } else {
                        for name in self.variable_declarator_names(child) {
                            info.fields.push(name);
                        }
                    }
                }
                // Nested types.
                _ => self.collect(child, scope),
            }
        }
        scope.pop();

        self.classes.insert(qn, info);
    }

    // ── Pass 2: emit events ───────────────────────────────────────────────

    fn emit(&mut self, node: Node, scope: &mut Vec<String>, class_qn: Option<&str>) {
        match node.kind() {
            "namespace_definition" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                if let Some(body) = node.child_by_field_name("body") {
                    let pushed = !name.is_empty();
                    if pushed {
                        scope.push(name);
                    }
                    for child in children(body) {
                        self.emit(child, scope, None);
                    }
                    if pushed {
                        scope.pop();
                    }
                }
                return;
            }
            "class_specifier" | "struct_specifier" => {
                self.emit_class(node, scope, class_qn);
                return;
            }
            "enum_specifier" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let qn = join_scope(scope, &self.text(name_node));
                    self.events.push(IndexEvent::TypeDecl {
                        entity: type_entity(&qn),
                        pos: self.pos(name_node),
                        is_definition: node.child_by_field_name("body").is_some(),
                        declaring_type: class_qn.map(type_entity),
                        bases: Vec::new(),
                        alias_of: None,
                    });
                }
            }
            "alias_declaration" | "type_definition" => {
                self.emit_alias(node, scope, class_qn);
            }
            "function_definition" => {
                self.emit_function_definition(node, scope, class_qn);
                return;
            }
            "declaration" => {
                self.emit_declaration(node, scope, class_qn);
                return;
            }
            "template_declaration" => {
                for child in children(node) {
                    self.emit(child, scope, class_qn);
                }
                return;
            }
            _ => {}
        }

        for child in children(node) {
            self.emit(child, scope, class_qn);
        }
    }

    fn emit_class(&mut self, node: Node, scope: &mut Vec<String>, enclosing: Option<&str>) {
        let body = node.child_by_field_name("body");
        let (name, qn, pos) = match node.child_by_field_name("name") {
            Some(name_node) => {
                let name = self.text(name_node);
                let qn = join_scope(scope, &name);
                (name, qn, self.pos(name_node))
            }
            None => {
                // Anonymous type: synthesize a collision-free USR from the
                // position.
                if body.is_none() {
                    return;
                }
                let pos = self.pos(node);
                let qn = format!("{}@{}:{}", self.path, pos.line, pos.column);
                (String::new(), qn, pos)
            }
        };

        let mut base_entities = Vec::new();
        for base in self.base_specifier_names(node) {
            base_entities.push(type_entity(&self.resolve_type_name(&base, scope)));
        }

        self.events.push(IndexEvent::TypeDecl {
            entity: EntityInfo::new(format!("t:{qn}"), name.clone(), qn.clone()),
            pos,
            is_definition: body.is_some(),
            declaring_type: enclosing.map(type_entity),
            bases: base_entities,
            alias_of: None,
        });

        let Some(body) = body else {
            return;
        };
        if name.is_empty() {
            return;
        }

        scope.push(name);
        let class_qn = qn;
        for child in children(body) {
            match child.kind() {
                "function_definition" => {
                    self.emit_function_definition(child, scope, Some(&class_qn));
                }
                "field_declaration" => {
                    if find_function_declarator(child).is_some() {
                        self.emit_method_declaration(child, scope, &class_qn);
                    } else {
                        self.emit_field(child, scope, &class_qn);
                    }
                }
                _ => self.emit(child, scope, Some(&class_qn)),
            }
        }
        scope.pop();
    }

    /// `virtual void m();` or `void m() override;` inside a class body.
    fn emit_method_declaration(&mut self, node: Node, scope: &[String], class_qn: &str) {
        let Some(declarator) = find_function_declarator(node) else {
            return;
        };
        let Some(name_node) = self.declarator_name_node(declarator) else {
            return;
        };
        let simple = self.text(name_node);
        let qn = join_scope(scope, &simple);

        self.events.push(IndexEvent::FuncDecl {
            entity: EntityInfo::new(format!("f:{qn}"), simple.clone(), qn),
            pos: self.pos(name_node),
            is_definition: false,
            declaring_type: Some(type_entity(class_qn)),
            overrides: self.compute_overrides(class_qn, &simple),
        });
    }

    fn emit_field(&mut self, node: Node, scope: &[String], class_qn: &str) {
        let variable_type = self.declared_type_entity(node, scope);
        self.emit_type_ref_for(node, scope);
        for (name_node, simple) in self.variable_declarator_name_nodes(node) {
            let qn = join_scope(scope, &simple);
            self.events.push(IndexEvent::VarDecl {
                entity: EntityInfo::new(format!("v:{qn}"), simple, qn),
                pos: self.pos(name_node),
                is_definition: false,
                variable_type: variable_type.clone(),
                declaring_type: Some(type_entity(class_qn)),
                enclosing_func: None,
            });
        }
    }

    fn emit_alias(&mut self, node: Node, scope: &[String], class_qn: Option<&str>) {
        let Some(name) = self.alias_name(node) else {
            return;
        };
        let Some(name_node) = self.alias_name_node(node) else {
            return;
        };
        let qn = join_scope(scope, &name);

        let alias_of = self
            .alias_target_name(node)
            .map(|target| type_entity(&self.resolve_type_name(&target, scope)));

        self.events.push(IndexEvent::TypeDecl {
            entity: EntityInfo::new(format!("t:{qn}"), name, qn),
            pos: self.pos(name_node),
            is_definition: true,
            declaring_type: class_qn.map(type_entity),
            bases: Vec::new(),
            alias_of,
        });
    }

    fn emit_function_definition(
        &mut self,
        node: Node,
        scope: &mut Vec<String>,
        class_qn: Option<&str>,
    ) {
        let Some((simple, spelled)) = self.declarator_parts(node) else {
            return;
        };
        let Some(declarator) = find_function_declarator(node) else {
            return;
        };
        let Some(name_node) = self.declarator_name_node(declarator) else {
            return;
        };

        let qn = join_scope(scope, &spelled);
        // Out-of-line definitions (`void A::m() { ... }`) recover their
        // declaring type from the spelled qualifier.
        let declaring = match class_qn {
            Some(c) => Some(c.to_string()),
            None => match spelled.rsplit_once("::") {
                Some((prefix, _)) => {
                    let resolved = self.resolve_type_name(prefix, scope);
                    self.classes.contains_key(&resolved).then_some(resolved)
                }
                None => None,
            },
        };

        let entity = EntityInfo::new(format!("f:{qn}"), simple.clone(), qn.clone());
        let overrides = declaring
            .as_deref()
            .map(|c| self.compute_overrides(c, &simple))
            .unwrap_or_default();

        self.events.push(IndexEvent::FuncDecl {
            entity: entity.clone(),
            pos: self.pos(name_node),
            is_definition: true,
            declaring_type: declaring.as_deref().map(type_entity),
            overrides,
        });

        let mut ctx = BodyCtx {
            func: Some(entity),
            locals: HashMap::new(),
        };
        self.emit_parameters(declarator, &qn, &mut ctx, scope);
        if let Some(body) = node.child_by_field_name("body") {
            let member_class = declaring;
            self.emit_stmt(body, scope, member_class.as_deref(), &mut ctx);
        }
    }

    fn emit_parameters(
        &mut self,
        declarator: Node,
        func_qn: &str,
        ctx: &mut BodyCtx,
        scope: &[String],
    ) {
        let Some(params) = declarator.child_by_field_name("parameters") else {
            return;
        };
        for param in children(params) {
            if param.kind() != "parameter_declaration" {
                continue;
            }
            let variable_type = self.declared_type_entity(param, scope);
            let Some(decl) = param.child_by_field_name("declarator") else {
                continue;
            };
            let Some(name_node) = self.declarator_name_node(decl) else {
                continue;
            };
            let simple = self.text(name_node);
            let qn = format!("{func_qn}::{simple}");
            ctx.locals.insert(simple.clone(), qn.clone());
            self.events.push(IndexEvent::VarDecl {
                entity: EntityInfo::new(format!("v:{qn}"), simple, qn),
                pos: self.pos(name_node),
                is_definition: true,
                variable_type,
                declaring_type: None,
                enclosing_func: ctx.func.clone(),
            });
        }
    }

    /// Walk statements and expressions inside a function body or an
    /// initializer, emitting local declarations, calls, and references.
    fn emit_stmt(&mut self, node: Node, scope: &[String], class_qn: Option<&str>, ctx: &mut BodyCtx) {
        match node.kind() {
            "declaration" => {
                let variable_type = self.declared_type_entity(node, scope);
                self.emit_type_ref_for(node, scope);
                let owner_qn = ctx
                    .func
                    .as_ref()
                    .map(|f| f.qualified_name.clone())
                    .unwrap_or_else(|| scope.join("::"));
                for (name_node, simple) in self.variable_declarator_name_nodes(node) {
                    let qn = if owner_qn.is_empty() {
                        simple.clone()
                    } else {
                        format!("{owner_qn}::{simple}")
                    };
                    ctx.locals.insert(simple.clone(), qn.clone());
                    self.events.push(IndexEvent::VarDecl {
                        entity: EntityInfo::new(format!("v:{qn}"), simple, qn),
                        pos: self.pos(name_node),
                        is_definition: true,
                        variable_type: variable_type.clone(),
                        declaring_type: None,
                        enclosing_func: ctx.func.clone(),
                    });
                }
                // Initializers may contain calls and references.
                for child in children(node) {
                    if child.kind() == "init_declarator" {
                        if let Some(value) = child.child_by_field_name("value") {
                            self.emit_stmt(value, scope, class_qn, ctx);
                        }
                    }
                }
                return;
            }
            "call_expression" => {
                self.emit_call(node, scope, class_qn, ctx);
                return;
            }
            "identifier" => {
                let name = self.text(node);
                if let Some(var_qn) = self.resolve_var(&name, class_qn, ctx) {
                    self.events.push(IndexEvent::VarRef {
                        entity: var_entity(&var_qn),
                        pos: self.pos(node),
                    });
                }
                return;
            }
            "type_identifier" => {
                let name = self.text(node);
                let qn = self.resolve_type_name(&name, scope);
                if self.known_types.contains(&qn) {
                    self.events.push(IndexEvent::TypeRef {
                        entity: type_entity(&qn),
                        pos: self.pos(node),
                    });
                }
                return;
            }
            _ => {}
        }

        for child in children(node) {
            self.emit_stmt(child, scope, class_qn, ctx);
        }
    }

    fn emit_call(&mut self, node: Node, scope: &[String], class_qn: Option<&str>, ctx: &mut BodyCtx) {
        if let Some(function) = node.child_by_field_name("function") {
            let (callee, pos) = match function.kind() {
                "identifier" => {
                    let name = self.text(function);
                    (self.resolve_func(&name, class_qn), self.pos(function))
                }
                "field_expression" => {
                    // `obj.method(...)` / `ptr->method(...)`: resolve by
                    // method name; the receiver is walked as an expression.
                    let Some(field) = function.child_by_field_name("field") else {
                        return;
                    };
                    let name = self.text(field);
                    if let Some(arg) = function.child_by_field_name("argument") {
                        self.emit_stmt(arg, scope, class_qn, ctx);
                    }
                    (self.resolve_func(&name, class_qn), self.pos(field))
                }
                "qualified_identifier" => {
                    let spelled = self.text(function);
                    let simple = spelled.rsplit("::").next().unwrap_or(&spelled).to_string();
                    let qn = self.resolve_spelled_func(&spelled, scope);
                    (
                        EntityInfo::new(format!("f:{qn}"), simple, qn),
                        self.pos(function),
                    )
                }
                // Indirect calls through arbitrary expressions are walked
                // but not attributed to a callee.
                _ => {
                    self.emit_stmt(function, scope, class_qn, ctx);
                    if let Some(args) = node.child_by_field_name("arguments") {
                        self.emit_stmt(args, scope, class_qn, ctx);
                    }
                    return;
                }
            };

            self.events.push(IndexEvent::Call {
                callee,
                caller: ctx.func.clone(),
                pos,
            });
        }

        if let Some(args) = node.child_by_field_name("arguments") {
            self.emit_stmt(args, scope, class_qn, ctx);
        }
    }

    fn emit_declaration(&mut self, node: Node, scope: &mut Vec<String>, class_qn: Option<&str>) {
        if let Some(declarator) = find_function_declarator(node) {
            // Forward declaration of a free function.
            let Some((simple, spelled)) = self.name_of_declarator(declarator) else {
                return;
            };
            let Some(name_node) = self.declarator_name_node(declarator) else {
                return;
            };
            let qn = join_scope(scope, &spelled);
            self.events.push(IndexEvent::FuncDecl {
                entity: EntityInfo::new(format!("f:{qn}"), simple, qn),
                pos: self.pos(name_node),
                is_definition: false,
                declaring_type: class_qn.map(type_entity),
                overrides: Vec::new(),
            });
            return;
        }

        let declarator_names = self.variable_declarator_name_nodes(node);
        if declarator_names.is_empty() {
            // Bare type declaration (`struct A;` or a definition wrapped in
            // a declaration); fall through to the generic handlers.
            for child in children(node) {
                self.emit(child, scope, class_qn);
            }
            return;
        }

        // `struct S {} s;` defines the type inline.
        for child in children(node) {
            if matches!(
                child.kind(),
                "class_specifier" | "struct_specifier" | "enum_specifier"
            ) && child.child_by_field_name("body").is_some()
            {
                self.emit(child, scope, class_qn);
            }
        }

        let variable_type = self.declared_type_entity(node, scope);
        self.emit_type_ref_for(node, scope);
        let is_definition = !self.has_extern_specifier(node);
        for (name_node, simple) in declarator_names {
            let qn = join_scope(scope, &simple);
            self.events.push(IndexEvent::VarDecl {
                entity: EntityInfo::new(format!("v:{qn}"), simple, qn),
                pos: self.pos(name_node),
                is_definition,
                variable_type: variable_type.clone(),
                declaring_type: class_qn.map(type_entity),
                enclosing_func: None,
            });
        }

        // Global initializers run outside any function: calls inside them
        // keep the callee usage but get no caller edge.
        let mut ctx = BodyCtx {
            func: None,
            locals: HashMap::new(),
        };
        for child in children(node) {
            if child.kind() == "init_declarator" {
                if let Some(value) = child.child_by_field_name("value") {
                    self.emit_stmt(value, scope, class_qn, &mut ctx);
                }
            }
        }
    }

    // ── Name resolution ───────────────────────────────────────────────────

    /// Resolve a spelled type name against the scope chain, innermost
    /// first. Unknown names (builtins, out-of-unit types) resolve to their
    /// own spelling.
    fn resolve_type_name(&self, spelled: &str, scope: &[String]) -> String {
        for depth in (0..=scope.len()).rev() {
            let candidate = join_scope(&scope[..depth], spelled);
            if self.known_types.contains(&candidate) {
                return candidate;
            }
        }
        spelled.to_string()
    }

    /// Resolve a called simple name: methods of the enclosing class first,
    /// then any function known to the unit, else the spelling itself.
    fn resolve_func(&self, name: &str, class_qn: Option<&str>) -> EntityInfo {
        if let Some(class_qn) = class_qn {
            if let Some(qn) = self.find_method(class_qn, name) {
                return EntityInfo::new(format!("f:{qn}"), name, qn);
            }
        }
        let qn = self
            .funcs_by_name
            .get(name)
            .and_then(|candidates| candidates.first().cloned())
            .unwrap_or_else(|| name.to_string());
        EntityInfo::new(format!("f:{qn}"), name, qn)
    }

    fn resolve_spelled_func(&self, spelled: &str, scope: &[String]) -> String {
        let simple = spelled.rsplit("::").next().unwrap_or(spelled);
        if let Some(candidates) = self.funcs_by_name.get(simple) {
            for depth in (0..=scope.len()).rev() {
                let candidate = join_scope(&scope[..depth], spelled);
                if candidates.contains(&candidate) {
                    return candidate;
                }
            }
        }
        spelled.to_string()
    }

    /// Look up `name` as a method of `class_qn` or its transitive bases.
    fn find_method(&self, class_qn: &str, name: &str) -> Option<String> {
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(class_qn);
        let mut seen = HashSet::new();
        while let Some(qn) = queue.pop_front() {
            if !seen.insert(qn.to_string()) {
                continue;
            }
            if let Some(info) = self.classes.get(qn) {
                if info.methods.iter().any(|m| m == name) {
                    return Some(format!("{qn}::{name}"));
                }
                for base in &info.bases {
                    queue.push_back(base);
                }
            }
        }
        None
    }

    /// Methods of transitive bases that `method_name` overrides, nearest
    /// base first (breadth-first over the base lists in declaration order).
    fn compute_overrides(&self, class_qn: &str, method_name: &str) -> Vec<EntityInfo> {
        let mut result = Vec::new();
        let Some(info) = self.classes.get(class_qn) else {
            return result;
        };
        let mut queue: VecDeque<&str> = info.bases.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        while let Some(base_qn) = queue.pop_front() {
            if !seen.insert(base_qn.to_string()) {
                continue;
            }
            if let Some(base) = self.classes.get(base_qn) {
                if base.methods.iter().any(|m| m == method_name) {
                    let qn = format!("{base_qn}::{method_name}");
                    result.push(EntityInfo::new(format!("f:{qn}"), method_name, qn));
                }
                for b in &base.bases {
                    queue.push_back(b);
                }
            }
        }
        result
    }

    fn resolve_var(&self, name: &str, class_qn: Option<&str>, ctx: &BodyCtx) -> Option<String> {
        if let Some(qn) = ctx.locals.get(name) {
            return Some(qn.clone());
        }
        if let Some(class_qn) = class_qn {
            // Fields of the class or its transitive bases.
            let mut queue: VecDeque<&str> = VecDeque::new();
            queue.push_back(class_qn);
            let mut seen = HashSet::new();
            while let Some(qn) = queue.pop_front() {
                if !seen.insert(qn.to_string()) {
                    continue;
                }
                if let Some(info) = self.classes.get(qn) {
                    if info.fields.iter().any(|f| f == name) {
                        return Some(format!("{qn}::{name}"));
                    }
                    for base in &info.bases {
                        queue.push_back(base);
                    }
                }
            }
        }
        self.globals.get(name).cloned()
    }

    // ── Syntax helpers ────────────────────────────────────────────────────

    fn text(&self, node: Node) -> String {
        node.utf8_text(self.source).unwrap_or("").to_string()
    }

    fn pos(&self, node: Node) -> SourcePos {
        let point = node.start_position();
        SourcePos {
            file: Some(self.path.to_string()),
            line: point.row as u32 + 1,
            column: point.column as u32 + 1,
            in_system_header: self.in_system,
        }
    }

    /// (simple name, spelled possibly-qualified name) for the declarator of
    /// a function definition node.
    fn declarator_parts(&self, node: Node) -> Option<(String, String)> {
        let declarator = find_function_declarator(node)?;
        self.name_of_declarator(declarator)
    }

    fn name_of_declarator(&self, declarator: Node) -> Option<(String, String)> {
        let inner = declarator.child_by_field_name("declarator")?;
        match inner.kind() {
            "qualified_identifier" => {
                let spelled = self.text(inner);
                let simple = spelled.rsplit("::").next().unwrap_or(&spelled).to_string();
                Some((simple, spelled))
            }
            _ => {
                let name_node = self.declarator_name_node(declarator)?;
                let simple = self.text(name_node);
                Some((simple.clone(), simple))
            }
        }
    }

    /// The innermost name token of a declarator.
    fn declarator_name_node<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        match node.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
            | "operator_name" => Some(node),
            "qualified_identifier" => match node.child_by_field_name("name") {
                Some(name) => self.declarator_name_node(name),
                None => None,
            },
            "function_declarator"
            | "pointer_declarator"
            | "reference_declarator"
            | "array_declarator"
            | "init_declarator" => node
                .child_by_field_name("declarator")
                .and_then(|d| self.declarator_name_node(d)),
            "parenthesized_declarator" => children(node)
                .into_iter()
                .find(|c| c.kind() != "(" && c.kind() != ")")
                .and_then(|c| self.declarator_name_node(c)),
            _ => None,
        }
    }

    /// Name nodes of every variable declarator directly under a
    /// declaration/field node.
    fn variable_declarator_name_nodes<'t>(&self, node: Node<'t>) -> Vec<(Node<'t>, String)> {
        let mut out = Vec::new();
        for child in children(node) {
            let candidate = match child.kind() {
                "init_declarator" => child
                    .child_by_field_name("declarator")
                    .and_then(|d| self.declarator_name_node(d)),
                "identifier" | "field_identifier" => Some(child),
                "pointer_declarator" | "reference_declarator" | "array_declarator" => {
                    self.declarator_name_node(child)
                }
                _ => None,
            };
            if let Some(name_node) = candidate {
                out.push((name_node, self.text(name_node)));
            }
        }
        out
    }

    fn variable_declarator_names(&self, node: Node) -> Vec<String> {
        self.variable_declarator_name_nodes(node)
            .into_iter()
            .map(|(_, name)| name)
            .collect()
    }

    /// Spelled names of every base specifier of a class node, in
    /// declaration order.
    fn base_specifier_names(&self, node: Node) -> Vec<String> {
        let mut out = Vec::new();
        for child in children(node) {
            if child.kind() != "base_class_clause" {
                continue;
            }
            collect_base_names(child, self.source, &mut out);
        }
        out
    }

    /// The entity for the declared type of a declaration/field/parameter
    /// node, when the grammar exposes one.
    fn declared_type_entity(&self, node: Node, scope: &[String]) -> Option<EntityInfo> {
        let type_node = node.child_by_field_name("type")?;
        let spelled = match type_node.kind() {
            "type_identifier" | "primitive_type" | "qualified_identifier" => self.text(type_node),
            "struct_specifier" | "class_specifier" | "enum_specifier" => {
                self.text(type_node.child_by_field_name("name")?)
            }
            _ => return None,
        };
        Some(type_entity(&self.resolve_type_name(&spelled, scope)))
    }

    /// Emit a TypeRef for the (non-builtin) declared type of a node.
    fn emit_type_ref_for(&mut self, node: Node, scope: &[String]) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        if type_node.kind() != "type_identifier" {
            return;
        }
        let qn = self.resolve_type_name(&self.text(type_node), scope);
        if self.known_types.contains(&qn) {
            self.events.push(IndexEvent::TypeRef {
                entity: type_entity(&qn),
                pos: self.pos(type_node),
            });
        }
    }

    fn alias_name_node<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        if node.kind() == "alias_declaration" {
            return node.child_by_field_name("name");
        }
        // typedef: the name is the declarator.
        let declarator = node.child_by_field_name("declarator")?;
        self.declarator_name_node(declarator)
    }

    fn alias_name(&self, node: Node) -> Option<String> {
        self.alias_name_node(node).map(|n| self.text(n))
    }

    /// Spelled name of the aliased type of a using/typedef declaration.
    fn alias_target_name(&self, node: Node) -> Option<String> {
        let type_node = if node.kind() == "alias_declaration" {
            // The target is a type_descriptor under the "type" field.
            let descriptor = node.child_by_field_name("type")?;
            descriptor.child_by_field_name("type").or(Some(descriptor))?
        } else {
            node.child_by_field_name("type")?
        };
        match type_node.kind() {
            "type_identifier" | "primitive_type" | "qualified_identifier" => {
                Some(self.text(type_node))
            }
            _ => None,
        }
    }

    fn has_extern_specifier(&self, node: Node) -> bool {
        children(node).into_iter().any(|c| {
            c.kind() == "storage_class_specifier" && self.text(c) == "extern"
        })
    }
}

/// All children of a node, in order.
fn children(node: Node) -> Vec<Node> {
    (0..node.child_count()).filter_map(|i| node.child(i)).collect()
}

fn find_function_declarator(node: Node) -> Option<Node> {
    for child in children(node) {
        match child.kind() {
            "function_declarator" => return Some(child),
            "pointer_declarator" | "reference_declarator" => {
                if let Some(found) = find_function_declarator(child) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    // Also look under the "declarator" field for wrapped declarators.
    let declarator = node.child_by_field_name("declarator")?;
    if declarator.kind() == "function_declarator" {
        Some(declarator)
    } else {
        None
    }
}

fn collect_base_names(node: Node, source: &[u8], out: &mut Vec<String>) {
    for child in (0..node.child_count()).filter_map(|i| node.child(i)) {
        match child.kind() {
            "type_identifier" | "qualified_identifier" => {
                out.push(child.utf8_text(source).unwrap_or("").to_string());
            }
            // `Base<T>`: the base is the template name.
            "template_type" => {
                let name = child.child_by_field_name("name").unwrap_or(child);
                out.push(name.utf8_text(source).unwrap_or("").to_string());
            }
            "access_specifier" | "virtual" | "," | ":" => {}
            _ => collect_base_names(child, source, out),
        }
    }
}

fn join_scope(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", scope.join("::"), name)
    }
}

fn last_segment(qn: &str) -> &str {
    qn.rsplit("::").next().unwrap_or(qn)
}

fn type_entity(qn: &str) -> EntityInfo {
    EntityInfo::new(format!("t:{qn}"), last_segment(qn), qn)
}

fn var_entity(qn: &str) -> EntityInfo {
    EntityInfo::new(format!("v:{qn}"), last_segment(qn), qn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<IndexEvent> {
        CppFrontend::new()
            .parse_source("/src/test.cc", source.as_bytes(), &[])
            .expect("parse should succeed")
    }

    fn func_decls(events: &[IndexEvent]) -> Vec<&IndexEvent> {
        events
            .iter()
            .filter(|e| matches!(e, IndexEvent::FuncDecl { .. }))
            .collect()
    }

    #[test]
    fn function_definition_event() {
        let events = parse("int add(int a, int b) { return a + b; }");
        let func = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::FuncDecl {
                    entity,
                    pos,
                    is_definition,
                    ..
                } if entity.short_name == "add" => Some((entity, pos, is_definition)),
                _ => None,
            })
            .expect("add should be reported");
        assert_eq!(func.0.usr, "f:add");
        assert!(*func.2);
        assert_eq!(func.1.line, 1);
        assert_eq!(func.1.column, 5);
    }

    #[test]
    fn parameters_become_vars() {
        let events = parse("int add(int a, int b) { return a + b; }");
        let params: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                IndexEvent::VarDecl {
                    entity,
                    enclosing_func: Some(f),
                    ..
                } => Some((entity.short_name.clone(), f.short_name.clone())),
                _ => None,
            })
            .collect();
        assert!(params.contains(&("a".to_string(), "add".to_string())));
        assert!(params.contains(&("b".to_string(), "add".to_string())));
    }

    #[test]
    fn call_carries_caller_and_callee() {
        let events = parse("void a() {}\nvoid b() { a(); }");
        let call = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::Call { callee, caller, pos } => Some((callee, caller, pos)),
                _ => None,
            })
            .expect("call should be reported");
        assert_eq!(call.0.usr, "f:a");
        assert_eq!(call.1.as_ref().unwrap().usr, "f:b");
        assert_eq!(call.2.line, 2);
        assert_eq!(call.2.column, 12);
    }

    #[test]
    fn call_in_global_initializer_has_no_caller() {
        let events = parse("int f();\nint g = f();");
        let call = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::Call { callee, caller, .. } => Some((callee, caller)),
                _ => None,
            })
            .expect("initializer call should be reported");
        assert_eq!(call.0.usr, "f:f");
        assert!(call.1.is_none());
    }

    #[test]
    fn base_specifiers_in_order() {
        let events = parse("struct A {};\nstruct B {};\nstruct C : A, B {};");
        let bases = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::TypeDecl { entity, bases, .. } if entity.short_name == "C" => {
                    Some(bases)
                }
                _ => None,
            })
            .expect("C should be reported");
        let usrs: Vec<_> = bases.iter().map(|b| b.usr.as_str()).collect();
        assert_eq!(usrs, vec!["t:A", "t:B"]);
    }

    #[test]
    fn method_override_links_nearest_base_first() {
        let events = parse(
            "struct A { virtual void m(); };\n\
             struct B : A { void m() override; };",
        );
        let overrides = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::FuncDecl {
                    entity, overrides, ..
                } if entity.usr == "f:B::m" => Some(overrides),
                _ => None,
            })
            .expect("B::m should be reported");
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].usr, "f:A::m");
    }

    #[test]
    fn transitive_override_collects_all_bases() {
        let events = parse(
            "struct A { virtual void m(); };\n\
             struct B : A { void m() override; };\n\
             struct C : B { void m() override; };",
        );
        let overrides = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::FuncDecl {
                    entity, overrides, ..
                } if entity.usr == "f:C::m" => Some(overrides),
                _ => None,
            })
            .expect("C::m should be reported");
        let usrs: Vec<_> = overrides.iter().map(|o| o.usr.as_str()).collect();
        assert_eq!(usrs, vec!["f:B::m", "f:A::m"]);
    }

    #[test]
    fn alias_declaration_reports_target() {
        let events = parse("using X = int;");
        let (entity, alias_of) = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::TypeDecl {
                    entity, alias_of, ..
                } if entity.short_name == "X" => Some((entity, alias_of)),
                _ => None,
            })
            .expect("X should be reported");
        assert_eq!(entity.usr, "t:X");
        assert_eq!(alias_of.as_ref().unwrap().usr, "t:int");
    }

    #[test]
    fn typedef_reports_target() {
        let events = parse("typedef int X;");
        let alias_of = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::TypeDecl {
                    entity, alias_of, ..
                } if entity.short_name == "X" => Some(alias_of),
                _ => None,
            })
            .expect("X should be reported");
        assert_eq!(alias_of.as_ref().unwrap().usr, "t:int");
    }

    #[test]
    fn member_variable_has_declaring_type() {
        let events = parse("struct Foo { int count; };");
        let var = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::VarDecl {
                    entity,
                    declaring_type,
                    variable_type,
                    ..
                } if entity.short_name == "count" => Some((entity, declaring_type, variable_type)),
                _ => None,
            })
            .expect("count should be reported");
        assert_eq!(var.0.usr, "v:Foo::count");
        assert_eq!(var.1.as_ref().unwrap().usr, "t:Foo");
        assert_eq!(var.2.as_ref().unwrap().usr, "t:int");
    }

    #[test]
    fn local_of_class_type_reports_type_and_ref() {
        let events = parse("struct Foo {};\nvoid run() { Foo foo; }");
        let var = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::VarDecl {
                    entity,
                    variable_type,
                    enclosing_func,
                    ..
                } if entity.short_name == "foo" => Some((entity, variable_type, enclosing_func)),
                _ => None,
            })
            .expect("foo should be reported");
        assert_eq!(var.1.as_ref().unwrap().usr, "t:Foo");
        assert_eq!(var.2.as_ref().unwrap().usr, "f:run");

        assert!(events.iter().any(|e| matches!(
            e,
            IndexEvent::TypeRef { entity, .. } if entity.usr == "t:Foo"
        )));
    }

    #[test]
    fn local_variable_reference() {
        let events = parse("int twice(int x) { return x + x; }");
        let refs: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                IndexEvent::VarRef { entity, pos } if entity.short_name == "x" => {
                    Some((entity.usr.clone(), pos.column))
                }
                _ => None,
            })
            .collect();
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|(usr, _)| usr == "v:twice::x"));
    }

    #[test]
    fn namespace_qualifies_names() {
        let events = parse("namespace lib { void helper() {} }");
        let func = func_decls(&events);
        let helper = func
            .iter()
            .find_map(|e| match e {
                IndexEvent::FuncDecl { entity, .. } if entity.short_name == "helper" => {
                    Some(entity)
                }
                _ => None,
            })
            .expect("helper should be reported");
        assert_eq!(helper.qualified_name, "lib::helper");
        assert_eq!(helper.usr, "f:lib::helper");
    }

    #[test]
    fn out_of_line_method_definition_recovers_class() {
        let events = parse(
            "struct A { void m(); };\n\
             void A::m() {}",
        );
        let def = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::FuncDecl {
                    entity,
                    is_definition: true,
                    declaring_type,
                    ..
                } if entity.short_name == "m" => Some((entity, declaring_type)),
                _ => None,
            })
            .expect("A::m definition should be reported");
        assert_eq!(def.0.usr, "f:A::m");
        assert_eq!(def.1.as_ref().unwrap().usr, "t:A");
    }

    #[test]
    fn forward_declaration_is_not_definition() {
        let events = parse("void run();");
        let decl = events
            .iter()
            .find_map(|e| match e {
                IndexEvent::FuncDecl {
                    entity,
                    is_definition,
                    ..
                } if entity.short_name == "run" => Some(is_definition),
                _ => None,
            })
            .expect("run should be reported");
        assert!(!decl);
    }

    #[test]
    fn extern_global_is_declaration_only() {
        let events = parse("extern int g;\nint h;");
        let mut defs = HashMap::new();
        for e in &events {
            if let IndexEvent::VarDecl {
                entity,
                is_definition,
                ..
            } = e
            {
                defs.insert(entity.short_name.clone(), *is_definition);
            }
        }
        assert_eq!(defs.get("g"), Some(&false));
        assert_eq!(defs.get("h"), Some(&true));
    }

    #[test]
    fn system_prefix_marks_positions() {
        let frontend = CppFrontend::new();
        let events = frontend
            .parse_source("/usr/include/string.h", b"void *memcpy();", &[])
            .unwrap();
        assert!(events.iter().all(|e| match e {
            IndexEvent::FuncDecl { pos, .. } => pos.in_system_header,
            _ => true,
        }));
    }

    #[test]
    fn isystem_argument_extends_prefixes() {
        let frontend = CppFrontend::new();
        let args = vec!["-isystem".to_string(), "/opt/sdk/include".to_string()];
        let events = frontend
            .parse_source("/opt/sdk/include/api.h", b"void api();", &args)
            .unwrap();
        assert!(events.iter().any(|e| match e {
            IndexEvent::FuncDecl { pos, .. } => pos.in_system_header,
            _ => false,
        }));
    }

    #[test]
    fn unsupported_garbage_produces_no_events() {
        // tree-sitter is error-tolerant; unknown syntax is absorbed rather
        // than failing the parse.
        let events = parse("@@@ $$$ ^^^");
        assert!(events.is_empty());
    }
}
