//! Event-stream index builder.
//!
//! Consumes the flat event stream a frontend produced for one translation
//! unit and populates an `IndexedFile`: interning entities by USR, resolving
//! source positions through the file table, deduplicating usage insertion,
//! and wiring the cross-relationships (parents/derived, base/overrides,
//! caller/callee, type instances, declaring types).
//!
//! A record may be created before its defining event is seen (e.g. a type
//! referenced before it is defined); names start empty in that case and are
//! backfilled by the defining event. Once set, names are not overwritten.

use crate::frontend::{EntityInfo, IndexEvent, SourcePos};
use crate::ids::{FuncId, Ref, TypeId, VarId};
use crate::indexed_file::IndexedFile;
use crate::location::Location;
use symdex_core::{CancelToken, IndexError};

/// Builds one `IndexedFile` from one frontend event stream. Not shared
/// across threads; cross-file parallelism runs one builder per unit.
pub struct IndexBuilder {
    file: IndexedFile,
    cancel: CancelToken,
}

impl IndexBuilder {
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_cancel(path, CancelToken::new())
    }

    pub fn with_cancel(path: impl Into<String>, cancel: CancelToken) -> Self {
        Self {
            file: IndexedFile::new(path),
            cancel,
        }
    }

    /// Consume the whole event stream and hand off the finished index.
    ///
    /// The cancellation token is checked between top-level events; on
    /// cancellation the partial index is abandoned and `Cancelled` is
    /// returned. No partial result is ever surfaced.
    pub fn build(
        mut self,
        events: impl IntoIterator<Item = IndexEvent>,
    ) -> Result<IndexedFile, IndexError> {
        for event in events {
            if self.cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }
            self.handle(event)?;
        }
        tracing::debug!(
            path = %self.file.path,
            types = self.file.types.len(),
            funcs = self.file.funcs.len(),
            vars = self.file.vars.len(),
            "indexed translation unit"
        );
        Ok(self.file)
    }

    /// Dispatch a single event.
    pub fn handle(&mut self, event: IndexEvent) -> Result<(), IndexError> {
        match event {
            IndexEvent::TypeDecl {
                entity,
                pos,
                is_definition,
                declaring_type,
                bases,
                alias_of,
            } => self.on_type_decl(entity, pos, is_definition, declaring_type, bases, alias_of),
            IndexEvent::FuncDecl {
                entity,
                pos,
                is_definition,
                declaring_type,
                overrides,
            } => self.on_func_decl(entity, pos, is_definition, declaring_type, overrides),
            IndexEvent::VarDecl {
                entity,
                pos,
                is_definition,
                variable_type,
                declaring_type,
                enclosing_func,
            } => self.on_var_decl(
                entity,
                pos,
                is_definition,
                variable_type,
                declaring_type,
                enclosing_func,
            ),
            IndexEvent::Call { callee, caller, pos } => self.on_call(callee, caller, pos),
            IndexEvent::FuncRef { entity, pos } => self.on_func_ref(entity, pos),
            IndexEvent::VarRef { entity, pos } => self.on_var_ref(entity, pos),
            IndexEvent::TypeRef { entity, pos } => self.on_type_ref(entity, pos),
        }
    }

    fn on_type_decl(
        &mut self,
        entity: EntityInfo,
        pos: SourcePos,
        is_definition: bool,
        declaring_type: Option<EntityInfo>,
        bases: Vec<EntityInfo>,
        alias_of: Option<EntityInfo>,
    ) -> Result<(), IndexError> {
        let id = self.file.to_type_id(&entity.usr);
        let loc = self.resolve_loc(&pos, true)?;

        {
            let t = self.file.resolve_type_mut(id);
            fill_names(&mut t.def.short_name, &mut t.def.qualified_name, &entity);
            if is_definition && t.def.definition.is_none() {
                t.def.definition = Some(loc);
                t.is_system_def = pos.in_system_header;
            }
            t.add_usage(loc, true);
        }

        if let Some(alias) = alias_of {
            let aliased = self.intern_type(&alias);
            let t = self.file.resolve_type_mut(id);
            if t.def.alias_of.is_none() {
                t.def.alias_of = Some(aliased);
            }
        }

        if let Some(parent) = declaring_type {
            let pid = self.intern_type(&parent);
            let p = self.file.resolve_type_mut(pid);
            if !p.def.types.contains(&id) {
                p.def.types.push(id);
            }
        }

        for base in &bases {
            let bid = self.intern_type(base);
            if bid == id {
                continue;
            }
            let t = self.file.resolve_type_mut(id);
            if !t.def.parents.contains(&bid) {
                t.def.parents.push(bid);
            }
            self.file.resolve_type_mut(bid).add_derived(id);
        }

        Ok(())
    }

    fn on_func_decl(
        &mut self,
        entity: EntityInfo,
        pos: SourcePos,
        is_definition: bool,
        declaring_type: Option<EntityInfo>,
        overrides: Vec<EntityInfo>,
    ) -> Result<(), IndexError> {
        let id = self.file.to_func_id(&entity.usr)?;
        let loc = self.resolve_loc(&pos, true)?;

        {
            let f = self.file.resolve_func_mut(id);
            fill_names(&mut f.def.short_name, &mut f.def.qualified_name, &entity);
            if is_definition {
                if f.def.definition.is_none() {
                    f.def.definition = Some(loc);
                    f.is_system_def = pos.in_system_header;
                }
            } else {
                f.add_declaration(loc);
            }
            f.add_usage(loc, true);
        }

        if let Some(parent) = declaring_type {
            let tid = self.intern_type(&parent);
            let f = self.file.resolve_func_mut(id);
            if f.def.declaring_type.is_none() {
                f.def.declaring_type = Some(tid);
            }
            let t = self.file.resolve_type_mut(tid);
            if !t.def.funcs.contains(&id) {
                t.def.funcs.push(id);
            }
        }

        for overridden in &overrides {
            let oid = self.intern_func(overridden)?;
            if oid == id {
                continue;
            }
            let f = self.file.resolve_func_mut(id);
            if f.def.base.is_none() {
                f.def.base = Some(oid);
            }
            self.file.resolve_func_mut(oid).add_derived(id);
        }

        Ok(())
    }

    fn on_var_decl(
        &mut self,
        entity: EntityInfo,
        pos: SourcePos,
        is_definition: bool,
        variable_type: Option<EntityInfo>,
        declaring_type: Option<EntityInfo>,
        enclosing_func: Option<EntityInfo>,
    ) -> Result<(), IndexError> {
        let id = self.file.to_var_id(&entity.usr)?;
        let loc = self.resolve_loc(&pos, true)?;

        {
            let v = self.file.resolve_var_mut(id);
            fill_names(&mut v.def.short_name, &mut v.def.qualified_name, &entity);
            if is_definition {
                if v.def.definition.is_none() {
                    v.def.definition = Some(loc);
                    v.is_system_def = pos.in_system_header;
                }
            } else if v.def.declaration.is_none() {
                v.def.declaration = Some(loc);
            }
            v.add_usage(loc, true);
        }

        if let Some(var_type) = variable_type {
            let tid = self.intern_type(&var_type);
            let v = self.file.resolve_var_mut(id);
            if v.def.variable_type.is_none() {
                v.def.variable_type = Some(tid);
            }
            self.file.resolve_type_mut(tid).add_instance(id);
        }

        if let Some(parent) = declaring_type {
            let tid = self.intern_type(&parent);
            let v = self.file.resolve_var_mut(id);
            if v.def.declaring_type.is_none() {
                v.def.declaring_type = Some(tid);
            }
            let t = self.file.resolve_type_mut(tid);
            if !t.def.vars.contains(&id) {
                t.def.vars.push(id);
            }
        }

        if let Some(func) = enclosing_func {
            let fid = self.intern_func(&func)?;
            let f = self.file.resolve_func_mut(fid);
            if !f.def.locals.contains(&id) {
                f.def.locals.push(id);
            }
        }

        Ok(())
    }

    fn on_call(
        &mut self,
        callee: EntityInfo,
        caller: Option<EntityInfo>,
        pos: SourcePos,
    ) -> Result<(), IndexError> {
        let callee_id = self.intern_func(&callee)?;
        let loc = self.resolve_loc(&pos, true)?;
        self.file.resolve_func_mut(callee_id).add_usage(loc, true);

        // A call whose semantic parent is not a function (static
        // initializer, default member initializer) keeps the usage above
        // but gets no caller edge.
        let Some(caller) = caller else {
            return Ok(());
        };

        let caller_id = self.intern_func(&caller)?;
        let edge = Ref::new(callee_id, loc);
        let f = self.file.resolve_func_mut(caller_id);
        if !f.def.callees.contains(&edge) {
            f.def.callees.push(edge);
            self.file
                .resolve_func_mut(callee_id)
                .callers
                .push(Ref::new(caller_id, loc));
        }
        Ok(())
    }

    fn on_func_ref(&mut self, entity: EntityInfo, pos: SourcePos) -> Result<(), IndexError> {
        let id = self.intern_func(&entity)?;
        let loc = self.resolve_loc(&pos, false)?;
        self.file.resolve_func_mut(id).add_usage(loc, true);
        Ok(())
    }

    fn on_var_ref(&mut self, entity: EntityInfo, pos: SourcePos) -> Result<(), IndexError> {
        let id = self.intern_var(&entity)?;
        let loc = self.resolve_loc(&pos, false)?;
        self.file.resolve_var_mut(id).add_usage(loc, true);
        Ok(())
    }

    fn on_type_ref(&mut self, entity: EntityInfo, pos: SourcePos) -> Result<(), IndexError> {
        let id = self.intern_type(&entity);
        let loc = self.resolve_loc(&pos, false)?;
        self.file.resolve_type_mut(id).add_usage(loc, true);
        Ok(())
    }

    fn resolve_loc(&mut self, pos: &SourcePos, interesting: bool) -> Result<Location, IndexError> {
        self.file
            .files
            .resolve(pos.file.as_deref(), pos.line, pos.column, interesting)
    }

    /// Intern a type entity and backfill its names.
    fn intern_type(&mut self, entity: &EntityInfo) -> TypeId {
        let id = self.file.to_type_id(&entity.usr);
        let t = self.file.resolve_type_mut(id);
        fill_names(&mut t.def.short_name, &mut t.def.qualified_name, entity);
        id
    }

    fn intern_func(&mut self, entity: &EntityInfo) -> Result<FuncId, IndexError> {
        let id = self.file.to_func_id(&entity.usr)?;
        let f = self.file.resolve_func_mut(id);
        fill_names(&mut f.def.short_name, &mut f.def.qualified_name, entity);
        Ok(id)
    }

    fn intern_var(&mut self, entity: &EntityInfo) -> Result<VarId, IndexError> {
        let id = self.file.to_var_id(&entity.usr)?;
        let v = self.file.resolve_var_mut(id);
        fill_names(&mut v.def.short_name, &mut v.def.qualified_name, entity);
        Ok(id)
    }
}

/// Backfill names on first sight; once set they are not overwritten.
fn fill_names(short: &mut String, qualified: &mut String, entity: &EntityInfo) {
    if short.is_empty() && !entity.short_name.is_empty() {
        *short = entity.short_name.clone();
    }
    if qualified.is_empty() && !entity.qualified_name.is_empty() {
        *qualified = entity.qualified_name.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(usr: &str, name: &str) -> EntityInfo {
        EntityInfo::new(usr, name, name)
    }

    fn pos(line: u32, column: u32) -> SourcePos {
        SourcePos::new("/src/a.cc", line, column)
    }

    fn type_def(usr: &str, name: &str, line: u32) -> IndexEvent {
        IndexEvent::TypeDecl {
            entity: entity(usr, name),
            pos: pos(line, 8),
            is_definition: true,
            declaring_type: None,
            bases: Vec::new(),
            alias_of: None,
        }
    }

    fn func_def(usr: &str, name: &str, line: u32) -> IndexEvent {
        IndexEvent::FuncDecl {
            entity: entity(usr, name),
            pos: pos(line, 6),
            is_definition: true,
            declaring_type: None,
            overrides: Vec::new(),
        }
    }

    #[test]
    fn func_definition_sets_interesting_location() {
        let file = IndexBuilder::new("/src/a.cc")
            .build([func_def("f:f", "f", 1)])
            .unwrap();

        assert_eq!(file.funcs.len(), 1);
        let f = &file.funcs[0];
        assert_eq!(f.def.short_name, "f");
        let def = f.def.definition.expect("definition set");
        assert!(def.interesting());
        assert_eq!(def.line(), 1);
        assert!(f.def.callees.is_empty());
        assert!(f.callers.is_empty());
    }

    #[test]
    fn call_wires_mirrored_edges_and_usage() {
        let call_pos = pos(2, 11);
        let file = IndexBuilder::new("/src/a.cc")
            .build([
                func_def("f:a", "a", 1),
                func_def("f:b", "b", 2),
                IndexEvent::Call {
                    callee: entity("f:a", "a"),
                    caller: Some(entity("f:b", "b")),
                    pos: call_pos.clone(),
                },
            ])
            .unwrap();

        let a = file.find_func_id("f:a").unwrap();
        let b = file.find_func_id("f:b").unwrap();

        let b_rec = file.resolve_func(b);
        assert_eq!(b_rec.def.callees.len(), 1);
        assert_eq!(b_rec.def.callees[0].id, a);

        let a_rec = file.resolve_func(a);
        assert_eq!(a_rec.callers.len(), 1);
        assert_eq!(a_rec.callers[0].id, b);
        assert_eq!(a_rec.callers[0].loc, b_rec.def.callees[0].loc);

        // The call site is an interesting use of the callee.
        let call_loc = b_rec.def.callees[0].loc;
        let use_entry = a_rec.uses.iter().find(|u| **u == call_loc).unwrap();
        assert!(use_entry.interesting());
    }

    #[test]
    fn call_without_caller_records_usage_only() {
        let file = IndexBuilder::new("/src/a.cc")
            .build([
                func_def("f:a", "a", 1),
                IndexEvent::Call {
                    callee: entity("f:a", "a"),
                    caller: None,
                    pos: pos(4, 3),
                },
            ])
            .unwrap();

        let a = file.resolve_func(file.find_func_id("f:a").unwrap());
        assert!(a.callers.is_empty());
        assert!(a.uses.iter().any(|u| u.line() == 4 && u.interesting()));
        // No synthetic caller record appeared.
        assert_eq!(file.funcs.len(), 1);
    }

    #[test]
    fn duplicate_call_site_not_doubled() {
        let call = IndexEvent::Call {
            callee: entity("f:a", "a"),
            caller: Some(entity("f:b", "b")),
            pos: pos(2, 11),
        };
        let file = IndexBuilder::new("/src/a.cc")
            .build([
                func_def("f:a", "a", 1),
                func_def("f:b", "b", 2),
                call.clone(),
                call,
            ])
            .unwrap();

        let b = file.resolve_func(file.find_func_id("f:b").unwrap());
        assert_eq!(b.def.callees.len(), 1);
        let a = file.resolve_func(file.find_func_id("f:a").unwrap());
        assert_eq!(a.callers.len(), 1);
    }

    #[test]
    fn inheritance_wires_parents_and_derived() {
        let file = IndexBuilder::new("/src/a.cc")
            .build([
                type_def("t:A", "A", 1),
                IndexEvent::TypeDecl {
                    entity: entity("t:B", "B"),
                    pos: pos(2, 8),
                    is_definition: true,
                    declaring_type: None,
                    bases: vec![entity("t:A", "A")],
                    alias_of: None,
                },
            ])
            .unwrap();

        let a = file.find_type_id("t:A").unwrap();
        let b = file.find_type_id("t:B").unwrap();
        assert_eq!(file.resolve_type(b).def.parents, vec![a]);
        assert_eq!(file.resolve_type(a).derived, vec![b]);
        assert!(file.resolve_type(a).def.definition.is_some());
        assert!(file.resolve_type(b).def.definition.is_some());
    }

    #[test]
    fn override_links_base_and_derived() {
        let file = IndexBuilder::new("/src/a.cc")
            .build([IndexEvent::FuncDecl {
                entity: entity("f:B::m", "m"),
                pos: pos(5, 10),
                is_definition: false,
                declaring_type: Some(entity("t:B", "B")),
                overrides: vec![entity("f:A::m", "m")],
            }])
            .unwrap();

        let derived_m = file.find_func_id("f:B::m").unwrap();
        let base_m = file.find_func_id("f:A::m").unwrap();
        assert_eq!(file.resolve_func(derived_m).def.base, Some(base_m));
        assert_eq!(file.resolve_func(base_m).derived, vec![derived_m]);
    }

    #[test]
    fn multiple_override_bases_keep_first() {
        let file = IndexBuilder::new("/src/a.cc")
            .build([IndexEvent::FuncDecl {
                entity: entity("f:C::m", "m"),
                pos: pos(9, 10),
                is_definition: true,
                declaring_type: Some(entity("t:C", "C")),
                overrides: vec![entity("f:A::m", "m"), entity("f:B::m", "m")],
            }])
            .unwrap();

        let c_m = file.find_func_id("f:C::m").unwrap();
        let a_m = file.find_func_id("f:A::m").unwrap();
        let b_m = file.find_func_id("f:B::m").unwrap();
        assert_eq!(file.resolve_func(c_m).def.base, Some(a_m));
        assert_eq!(file.resolve_func(a_m).derived, vec![c_m]);
        assert_eq!(file.resolve_func(b_m).derived, vec![c_m]);
    }

    #[test]
    fn alias_points_at_underlying_type() {
        let file = IndexBuilder::new("/src/a.cc")
            .build([IndexEvent::TypeDecl {
                entity: entity("t:X", "X"),
                pos: pos(1, 7),
                is_definition: true,
                declaring_type: None,
                bases: Vec::new(),
                alias_of: Some(entity("t:int", "int")),
            }])
            .unwrap();

        let x = file.find_type_id("t:X").unwrap();
        let int_id = file.find_type_id("t:int").unwrap();
        assert_eq!(file.resolve_type(x).def.alias_of, Some(int_id));
        assert_eq!(file.resolve_type(int_id).def.short_name, "int");
    }

    #[test]
    fn var_wires_type_instances_and_locals() {
        let file = IndexBuilder::new("/src/a.cc")
            .build([
                type_def("t:Foo", "Foo", 1),
                func_def("f:main", "main", 3),
                IndexEvent::VarDecl {
                    entity: entity("v:main::foo", "foo"),
                    pos: pos(4, 7),
                    is_definition: true,
                    variable_type: Some(entity("t:Foo", "Foo")),
                    declaring_type: None,
                    enclosing_func: Some(entity("f:main", "main")),
                },
            ])
            .unwrap();

        let foo_type = file.find_type_id("t:Foo").unwrap();
        let main_fn = file.find_func_id("f:main").unwrap();
        let var = file.find_var_id("v:main::foo").unwrap();

        assert_eq!(file.resolve_var(var).def.variable_type, Some(foo_type));
        assert_eq!(file.resolve_type(foo_type).instances, vec![var]);
        assert_eq!(file.resolve_func(main_fn).def.locals, vec![var]);
    }

    #[test]
    fn member_var_records_declaring_type() {
        let file = IndexBuilder::new("/src/a.cc")
            .build([
                type_def("t:Foo", "Foo", 1),
                IndexEvent::VarDecl {
                    entity: entity("v:Foo::count", "count"),
                    pos: pos(2, 7),
                    is_definition: false,
                    variable_type: None,
                    declaring_type: Some(entity("t:Foo", "Foo")),
                    enclosing_func: None,
                },
            ])
            .unwrap();

        let foo = file.find_type_id("t:Foo").unwrap();
        let count = file.find_var_id("v:Foo::count").unwrap();
        assert_eq!(file.resolve_var(count).def.declaring_type, Some(foo));
        assert_eq!(file.resolve_type(foo).def.vars, vec![count]);
        assert!(file.resolve_var(count).def.declaration.is_some());
        assert!(file.resolve_var(count).def.definition.is_none());
    }

    #[test]
    fn repeated_reference_at_same_location_dedups() {
        // The same token can be reported twice under macro expansion.
        let file = IndexBuilder::new("/src/a.cc")
            .build([
                IndexEvent::VarRef {
                    entity: entity("v:g", "g"),
                    pos: pos(7, 3),
                },
                IndexEvent::VarRef {
                    entity: entity("v:g", "g"),
                    pos: pos(7, 3),
                },
            ])
            .unwrap();

        let g = file.resolve_var(file.find_var_id("v:g").unwrap());
        assert_eq!(g.uses.len(), 1);
    }

    #[test]
    fn reference_before_definition_backfills_names() {
        let file = IndexBuilder::new("/src/a.cc")
            .build([
                IndexEvent::TypeRef {
                    entity: EntityInfo::new("t:Foo", "", ""),
                    pos: pos(3, 1),
                },
                type_def("t:Foo", "Foo", 9),
            ])
            .unwrap();

        let foo = file.resolve_type(file.find_type_id("t:Foo").unwrap());
        assert_eq!(foo.def.short_name, "Foo");
        assert_eq!(foo.def.definition.unwrap().line(), 9);
        // Both the early reference and the definition site are recorded.
        assert_eq!(foo.uses.len(), 2);
    }

    #[test]
    fn names_are_not_overwritten() {
        let file = IndexBuilder::new("/src/a.cc")
            .build([
                type_def("t:Foo", "Foo", 1),
                type_def("t:Foo", "Renamed", 1),
            ])
            .unwrap();

        let foo = file.resolve_type(file.find_type_id("t:Foo").unwrap());
        assert_eq!(foo.def.short_name, "Foo");
    }

    #[test]
    fn system_def_fixed_at_first_definition() {
        let mut sys_pos = pos(1, 6);
        sys_pos.in_system_header = true;

        let file = IndexBuilder::new("/src/a.cc")
            .build([
                IndexEvent::FuncDecl {
                    entity: entity("f:memcpy", "memcpy"),
                    pos: sys_pos,
                    is_definition: true,
                    declaring_type: None,
                    overrides: Vec::new(),
                },
                // A later non-system event does not flip the flag back.
                func_def("f:memcpy", "memcpy", 1),
            ])
            .unwrap();

        let f = file.resolve_func(file.find_func_id("f:memcpy").unwrap());
        assert!(f.is_system_def);
    }

    #[test]
    fn empty_func_usr_aborts_parse() {
        let result = IndexBuilder::new("/src/a.cc").build([IndexEvent::FuncDecl {
            entity: EntityInfo::new("", "f", "f"),
            pos: pos(1, 1),
            is_definition: true,
            declaring_type: None,
            overrides: Vec::new(),
        }]);
        assert!(matches!(result, Err(IndexError::InvariantViolated(_))));
    }

    #[test]
    fn cancellation_discards_partial_index() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = IndexBuilder::with_cancel("/src/a.cc", cancel)
            .build([func_def("f:a", "a", 1), func_def("f:b", "b", 2)]);
        assert!(matches!(result, Err(IndexError::Cancelled)));
    }

    #[test]
    fn non_call_func_reference_is_not_interesting() {
        // Taking a function's address references it without calling it.
        let file = IndexBuilder::new("/src/a.cc")
            .build([
                func_def("f:handler", "handler", 1),
                IndexEvent::FuncRef {
                    entity: entity("f:handler", "handler"),
                    pos: pos(3, 20),
                },
            ])
            .unwrap();

        let handler = file.resolve_func(file.find_func_id("f:handler").unwrap());
        let use_entry = handler.uses.iter().find(|u| u.line() == 3).unwrap();
        assert!(!use_entry.interesting());
        assert!(handler.callers.is_empty());
    }

    #[test]
    fn forward_declarations_accumulate() {
        let decl = |line| IndexEvent::FuncDecl {
            entity: entity("f:run", "run"),
            pos: pos(line, 6),
            is_definition: false,
            declaring_type: None,
            overrides: Vec::new(),
        };
        let file = IndexBuilder::new("/src/a.cc")
            .build([decl(1), decl(2), func_def("f:run", "run", 4)])
            .unwrap();

        let run = file.resolve_func(file.find_func_id("f:run").unwrap());
        assert_eq!(run.declarations.len(), 2);
        assert_eq!(run.def.definition.unwrap().line(), 4);
    }
}
