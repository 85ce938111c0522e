/// Declares a record struct together with its [`Record`](crate::schema::Record) schema.
///
/// The first entry is the identity field; every following entry is tagged
/// `[Patchable]` or `[Sealed]` and maps an external (JSON) name to a storage
/// (column) name. Declaration order is the column order.
///
/// ```ignore
/// record! {
///     #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
///     #[serde(default)]
///     pub struct Student {
///         id => "id" / "id",
///         [Patchable] first_name: String => "firstName" / "firstName",
///         [Patchable] class: String => "class" / "class",
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(#[$id_meta:meta])*
            $id_field:ident => $id_ext:literal / $id_col:literal,
            $(
                $(#[$field_meta:meta])*
                [$access:ident] $field:ident : $field_ty:ty => $ext:literal / $col:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(#[$id_meta])*
            #[serde(rename = $id_ext)]
            pub $id_field: i64,
            $(
                $(#[$field_meta])*
                #[serde(rename = $ext)]
                pub $field: $field_ty,
            )+
        }

        impl $crate::schema::Record for $name {
            const MODEL: &'static str = stringify!($name);

            fn fields() -> &'static [$crate::schema::FieldDescriptor] {
                const FIELDS: &[$crate::schema::FieldDescriptor] = &[
                    $crate::schema::FieldDescriptor::new(
                        $id_ext,
                        $id_col,
                        $crate::schema::Access::Identity,
                        $crate::core::FieldType::Integer,
                    ),
                    $(
                        $crate::schema::FieldDescriptor::new(
                            $ext,
                            $col,
                            $crate::schema::Access::$access,
                            <$field_ty as $crate::core::FieldValue>::FIELD_TYPE,
                        ),
                    )+
                ];
                FIELDS
            }

            fn values(&self) -> Vec<$crate::core::Value> {
                vec![
                    $crate::core::Value::Integer(self.$id_field),
                    $( $crate::core::FieldValue::to_value(&self.$field), )+
                ]
            }

            fn slots(&mut self) -> Vec<$crate::core::Slot<'_>> {
                vec![
                    $crate::core::Slot::Integer(&mut self.$id_field),
                    $( $crate::core::FieldValue::slot(&mut self.$field), )+
                ]
            }

            fn identity(&self) -> i64 {
                self.$id_field
            }

            fn set_identity(&mut self, identity: i64) {
                self.$id_field = identity;
            }
        }
    };
}
