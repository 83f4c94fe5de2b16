//! spec.md §2 item 5 / §4.3: deterministic builtin-symbol construction.
//!
//! The core never builds a mangled name by ad-hoc string concatenation
//! except the two documented escape hatches in spec.md §4.3 (the
//! `any`/`all` vector-of-i32 path and the broadcast size_t path), both of
//! which still go through [`Mangler::mangled_type`] rather than
//! hand-rolling a type string.

use crate::ir::types::{Type, TypeInner};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MangleArg {
    /// Force a particular signedness onto an otherwise-unsigned/signed
    /// integer type (used for e.g. `atomic_add` against `unsigned`).
    pub force_signed: Option<bool>,
    pub is_volatile: bool,
    pub is_const: bool,
}

/// spec.md §4.3.
pub trait Mangler {
    /// `applyMangledLength` in the original: Itanium-style `<len><name>`.
    fn mangled_length_prefix(&self, name: &str) -> String {
        format!("{}{}", name.len(), name)
    }

    fn mangled_type(&self, ty: &Type, arg: MangleArg) -> String;

    /// Like [`Mangler::mangled_type`], but with module access so `Vector`
    /// and `Pointer` element/pointee types can be dereferenced instead of
    /// degrading to the `?` placeholder. The default just forwards to
    /// `mangled_type`; `ItaniumMangler` overrides it.
    fn mangled_type_resolved(&self, module: &crate::ir::Module, ty: &Type, arg: MangleArg) -> String {
        let _ = module;
        self.mangled_type(ty, arg)
    }

    fn mangle(&self, module: &crate::ir::Module, base_name: &str, arg_types: &[(&Type, MangleArg)]) -> String {
        let mut out = self.mangled_length_prefix(base_name);
        if arg_types.is_empty() {
            out.push('v');
            return out;
        }
        for (ty, arg) in arg_types {
            out.push_str(&self.mangled_type_resolved(module, ty, *arg));
        }
        out
    }

    /// spec.md §4.3's first documented escape hatch: `any`/`all` are
    /// always mangled against a vector-of-i32 shape regardless of the
    /// operand's actual element width.
    fn mangle_any_all(&self, base_name: &str, vector_len: u32) -> String {
        let mangled_ty = if vector_len <= 1 {
            "i".to_string()
        } else {
            format!("Dv{}_i", vector_len)
        };
        format!("{}{}", self.mangled_length_prefix(base_name), mangled_ty)
    }

    /// spec.md §4.3's second escape hatch: the work-group branch of a
    /// broadcast wrapper casts its local-id arguments to `size_t`.
    fn mangle_broadcast(&self, module: &crate::ir::Module, op_name: &str, value_ty: &Type, dims: u32) -> String {
        let value = self.mangled_type_resolved(module, value_ty, MangleArg::default());
        let size_t = "m"; // size_t mangles as unsigned long on the 64-bit ABI used here
        let mut out = self.mangled_length_prefix(&format!("{}_broadcast", op_name));
        out.push_str(&value);
        for _ in 0..dims {
            out.push_str(size_t);
        }
        out
    }

    fn mangle_atomic(&self, op_name: &str, pointer_ty: &Type, value_ty: &Type) -> String {
        let mangled_value = self.mangled_type(value_ty, MangleArg::default());
        let mut out = self.mangled_length_prefix(op_name);
        out.push_str(&self.mangled_type(pointer_ty, MangleArg::default()));
        out.push_str(&mangled_value);
        out.push_str(&mangled_value);
        out
    }
}

pub struct ItaniumMangler;

impl Mangler for ItaniumMangler {
    fn mangled_type(&self, ty: &Type, arg: MangleArg) -> String {
        let base = match &ty.inner {
            TypeInner::Void => "v".to_string(),
            TypeInner::Int { width, signed } => {
                let signed = arg.force_signed.unwrap_or(*signed);
                match (*width, signed) {
                    (1, _) => "b".to_string(),
                    (8, true) => "c".to_string(),
                    (8, false) => "h".to_string(),
                    (16, true) => "s".to_string(),
                    (16, false) => "t".to_string(),
                    (32, true) => "i".to_string(),
                    (32, false) => "j".to_string(),
                    (64, true) => "l".to_string(),
                    (64, false) => "m".to_string(),
                    _ => "i".to_string(),
                }
            }
            TypeInner::Float { width: 16 } => "Dh".to_string(),
            TypeInner::Float { width: 64 } => "d".to_string(),
            TypeInner::Float { .. } => "f".to_string(),
            TypeInner::Vector { elem, len } => {
                // `elem` is an arena handle; without module context we
                // cannot dereference it here, so vector mangling is
                // resolved by callers through `mangle_vector_of` below.
                let _ = elem;
                format!("Dv{}_?", len)
            }
            TypeInner::Pointer { addr_space, .. } => {
                let mut prefix = String::from("P");
                prefix.push_str(&format!("U3AS{}", addr_space));
                if arg.is_const {
                    prefix.push('K');
                }
                if arg.is_volatile {
                    prefix.push('V');
                }
                prefix.push('?');
                prefix
            }
            TypeInner::Event => "9ocl_event".to_string(),
            TypeInner::Sampler => "11ocl_sampler".to_string(),
            TypeInner::Image { .. } => "9ocl_image".to_string(),
            TypeInner::Array { .. } => "PA".to_string(),
            TypeInner::Struct { .. } | TypeInner::Opaque { .. } => "S_".to_string(),
        };
        base
    }

    /// Fully resolves a vector/pointer mangled string against a module's
    /// type arena, filling in the `?` placeholders the unresolved
    /// `mangled_type` leaves when it cannot see through a `Handle`.
    fn mangled_type_resolved(&self, module: &crate::ir::Module, ty: &Type, arg: MangleArg) -> String {
        match &ty.inner {
            TypeInner::Vector { elem, len } => {
                let elem_ty = &module.types[*elem];
                format!(
                    "Dv{}_{}",
                    len,
                    self.mangled_type_resolved(module, elem_ty, arg)
                )
            }
            TypeInner::Pointer {
                pointee,
                addr_space,
            } => {
                let pointee_ty = &module.types[*pointee];
                let mut prefix = String::from("P");
                prefix.push_str(&format!("U3AS{}", addr_space));
                if arg.is_const {
                    prefix.push('K');
                }
                if arg.is_volatile {
                    prefix.push('V');
                }
                prefix.push_str(&self.mangled_type_resolved(module, pointee_ty, MangleArg::default()));
                prefix
            }
            _ => self.mangled_type(ty, arg),
        }
    }
}
